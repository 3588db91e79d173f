//! Provider context shared by every MAC context it creates

use std::fmt;
use std::sync::Arc;

use macprov_core::config::ProviderConfig;
use macprov_core::{MacError, MacResult, ResolutionMode};

use crate::cipher::{CipherRegistry, DefaultCipherRegistry};
use crate::engine::{DefaultEngineRegistry, EngineRegistry};
use crate::properties::PropertyQuery;

pub struct ProviderContext {
    pub(crate) mode: ResolutionMode,
    pub(crate) default_query: PropertyQuery,
    pub(crate) ciphers: Arc<dyn CipherRegistry>,
    pub(crate) engines: Arc<dyn EngineRegistry>,
}

impl ProviderContext {
    /// Build a provider over the built-in cipher and engine registries.
    pub fn new(config: &ProviderConfig) -> MacResult<Arc<Self>> {
        Self::with_registries(
            config,
            Arc::new(DefaultCipherRegistry::new()),
            Arc::new(DefaultEngineRegistry::new()),
        )
    }

    pub fn with_registries(
        config: &ProviderConfig,
        ciphers: Arc<dyn CipherRegistry>,
        engines: Arc<dyn EngineRegistry>,
    ) -> MacResult<Arc<Self>> {
        let default_query = match config.default_properties.as_deref() {
            Some(q) => PropertyQuery::parse(q)
                .map_err(|e| MacError::Config(format!("default_properties: {}", e.0)))?,
            None => PropertyQuery::default(),
        };
        tracing::debug!(mode = ?config.mode, "provider context created");
        Ok(Arc::new(Self {
            mode: config.mode,
            default_query,
            ciphers,
            engines,
        }))
    }

    pub fn standard() -> Arc<Self> {
        Self::from_mode(ResolutionMode::Standard)
    }

    pub fn restricted() -> Arc<Self> {
        Self::from_mode(ResolutionMode::Restricted)
    }

    fn from_mode(mode: ResolutionMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            default_query: PropertyQuery::default(),
            ciphers: Arc::new(DefaultCipherRegistry::new()),
            engines: Arc::new(DefaultEngineRegistry::new()),
        })
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("mode", &self.mode)
            .field("default_query", &self.default_query)
            .finish_non_exhaustive()
    }
}
