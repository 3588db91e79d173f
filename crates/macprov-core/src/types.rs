use serde::{Deserialize, Serialize};

/// How cipher names are resolved for a provider.
///
/// `Standard` allows engine attachment and the legacy name-table fallback.
/// `Restricted` confines resolution to property-query fetches: engine ids are
/// ignored and names that only the legacy table knows stay unresolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    #[default]
    Standard,
    Restricted,
}

impl ResolutionMode {
    pub fn allows_engines(self) -> bool {
        matches!(self, ResolutionMode::Standard)
    }

    pub fn allows_legacy_lookup(self) -> bool {
        matches!(self, ResolutionMode::Standard)
    }
}

/// Output format of the installed log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
