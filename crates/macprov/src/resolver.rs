//! Cipher resolution: property-query fetch, legacy fallback, engine attachment

use macprov_core::params::{Param, MAC_PARAM_CIPHER, MAC_PARAM_ENGINE, MAC_PARAM_PROPERTIES};
use macprov_core::{MacError, MacResult};

use crate::cipher::{CipherRef, Resolution};
use crate::engine::EngineHandle;
use crate::properties::PropertyQuery;
use crate::provider::ProviderContext;

/// A cipher selection plus the engine it should run through.
///
/// Held as staging on a context until key binding consumes it, and kept
/// afterwards inside the computation state it was bound into.
#[derive(Debug, Clone)]
pub struct CipherBinding {
    pub cipher: CipherRef,
    pub engine: Option<EngineHandle>,
}

impl ProviderContext {
    /// Resolve `name` by fetch first, then (standard mode only) legacy lookup.
    pub fn resolve_cipher(&self, name: &str, properties: Option<&str>) -> Resolution {
        let fetched = match PropertyQuery::parse(properties.unwrap_or("")) {
            Ok(query) => self
                .ciphers
                .fetch(name, &query.merged_over(&self.default_query)),
            Err(e) => {
                tracing::debug!(cipher = name, error = %e.0, "unparseable property query");
                Resolution::Unresolved
            }
        };

        fetched.or_else(|| {
            if !self.mode.allows_legacy_lookup() {
                return Resolution::Unresolved;
            }
            tracing::debug!(cipher = name, "fetch failed, trying legacy lookup");
            self.ciphers.legacy_lookup(name)
        })
    }

    /// Resolve an engine id. Restricted mode has no engines: the id is ignored.
    pub fn resolve_engine(&self, id: &str) -> MacResult<Option<EngineHandle>> {
        if !self.mode.allows_engines() {
            tracing::trace!(engine = id, "engines disabled, ignoring engine id");
            return Ok(None);
        }
        self.engines
            .by_id(id)
            .map(Some)
            .ok_or_else(|| MacError::UnresolvedEngine(id.to_string()))
    }

    /// Resolve engine (if any) then cipher into a complete binding.
    pub fn resolve(
        &self,
        name: &str,
        properties: Option<&str>,
        engine_id: Option<&str>,
    ) -> MacResult<CipherBinding> {
        let engine = match engine_id {
            Some(id) => self.resolve_engine(id)?,
            None => None,
        };
        let cipher = self
            .resolve_cipher(name, properties)
            .into_option()
            .ok_or_else(|| MacError::UnresolvedCipher(name.to_string()))?;

        tracing::debug!(
            cipher = cipher.name,
            owned = cipher.is_owned(),
            engine = engine.as_ref().map(|e| e.id.as_str()),
            "cipher resolved"
        );
        Ok(CipherBinding { cipher, engine })
    }

    /// Read the cipher/engine/properties group out of a parameter slice.
    ///
    /// Returns `None` when no cipher is named. Engine and properties are only
    /// consulted together with a cipher, and nothing is returned unless the
    /// whole group resolves.
    pub(crate) fn resolve_params(&self, params: &[Param]) -> MacResult<Option<CipherBinding>> {
        let Some(p) = Param::locate(params, MAC_PARAM_CIPHER) else {
            return Ok(None);
        };
        let name = p.as_utf8_string()?;

        let engine_id = match Param::locate(params, MAC_PARAM_ENGINE) {
            Some(p) if self.mode.allows_engines() => Some(p.as_utf8_string()?),
            _ => None,
        };
        let properties = match Param::locate(params, MAC_PARAM_PROPERTIES) {
            Some(p) => Some(p.as_utf8_string()?),
            None => None,
        };

        self.resolve(name, properties, engine_id).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macprov_core::config::ProviderConfig;
    use macprov_core::params::MAC_PARAM_KEY;

    #[test]
    fn test_fetch_wins_over_legacy() {
        let provider = ProviderContext::standard();
        let cipher = provider
            .resolve_cipher("AES-128-CBC", None)
            .into_option()
            .unwrap();
        assert!(cipher.is_owned());
    }

    #[test]
    fn test_legacy_fallback_in_standard_mode() {
        let provider = ProviderContext::standard();
        let cipher = provider.resolve_cipher("aes256", None).into_option().unwrap();
        assert!(!cipher.is_owned());
        assert_eq!(cipher.name, "AES-256-CBC");
    }

    #[test]
    fn test_no_legacy_fallback_in_restricted_mode() {
        let provider = ProviderContext::restricted();
        assert!(provider.resolve_cipher("aes256", None).into_option().is_none());
        assert!(provider
            .resolve_cipher("AES-256-CBC", None)
            .into_option()
            .is_some());
    }

    #[test]
    fn test_bad_query_falls_back_to_legacy() {
        let provider = ProviderContext::standard();
        let cipher = provider
            .resolve_cipher("AES-128-CBC", Some("=nonsense"))
            .into_option()
            .unwrap();
        assert!(!cipher.is_owned());
    }

    #[test]
    fn test_default_properties_apply() {
        let config = ProviderConfig {
            default_properties: Some("fips=yes".into()),
            ..ProviderConfig::restricted()
        };
        let provider = ProviderContext::new(&config).unwrap();
        assert!(provider
            .resolve_cipher("AES-128-ECB", None)
            .into_option()
            .is_none());
        let cbc = provider
            .resolve_cipher("AES-128-CBC", None)
            .into_option()
            .unwrap();
        assert_eq!(cbc.properties, &[("provider", "fips"), ("fips", "yes")]);
    }

    #[test]
    fn test_unknown_engine_is_hard_failure() {
        let provider = ProviderContext::standard();
        let err = provider
            .resolve("AES-128-CBC", None, Some("missing"))
            .unwrap_err();
        assert!(matches!(err, MacError::UnresolvedEngine(id) if id == "missing"));
    }

    #[test]
    fn test_engine_ignored_in_restricted_mode() {
        let provider = ProviderContext::restricted();
        let binding = provider
            .resolve("AES-128-CBC", None, Some("missing"))
            .unwrap();
        assert!(binding.engine.is_none());
    }

    #[test]
    fn test_resolve_params_without_cipher() {
        let provider = ProviderContext::standard();
        let params = [Param::octet_string(MAC_PARAM_KEY, vec![0u8; 16])];
        assert!(provider.resolve_params(&params).unwrap().is_none());
    }

    #[test]
    fn test_resolve_params_type_checks_group() {
        let provider = ProviderContext::standard();
        let params = [
            Param::utf8_string(MAC_PARAM_CIPHER, "AES-128-CBC"),
            Param::octet_string(MAC_PARAM_PROPERTIES, b"fips=yes".to_vec()),
        ];
        assert!(matches!(
            provider.resolve_params(&params),
            Err(MacError::InvalidParameterType { .. })
        ));
    }

    #[test]
    fn test_resolve_params_with_engine() {
        let provider = ProviderContext::standard();
        let params = [
            Param::utf8_string(MAC_PARAM_CIPHER, "AES-192-CBC"),
            Param::utf8_string(MAC_PARAM_ENGINE, "builtin"),
        ];
        let binding = provider.resolve_params(&params).unwrap().unwrap();
        assert_eq!(binding.cipher.name, "AES-192-CBC");
        assert_eq!(binding.engine.unwrap().id, "builtin");
    }
}
