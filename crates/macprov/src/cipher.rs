//! Cipher descriptors, ownership-tagged handles and the cipher registry
//!
//! Two resolution paths exist:
//! - `fetch`: name + property query against registered implementations.
//!   Returns an owned, reference-counted handle.
//! - `legacy_lookup`: name-only lookup in a static alias table. Returns a
//!   borrowed `'static` handle that is never released.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::properties::{Property, PropertyQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCipher {
    Aes128,
    Aes192,
    Aes256,
}

impl BlockCipher {
    pub fn key_len(self) -> usize {
        match self {
            BlockCipher::Aes128 => 16,
            BlockCipher::Aes192 => 24,
            BlockCipher::Aes256 => 32,
        }
    }

    pub fn block_size(self) -> usize {
        16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    Ecb,
    Cbc,
    Gcm,
}

/// Immutable description of one cipher implementation
#[derive(Debug, PartialEq, Eq)]
pub struct CipherDescriptor {
    /// Canonical name, e.g. "AES-128-CBC"
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub algorithm: BlockCipher,
    pub mode: CipherMode,
    pub properties: &'static [Property],
}

impl CipherDescriptor {
    pub fn key_len(&self) -> usize {
        self.algorithm.key_len()
    }

    pub fn block_size(&self) -> usize {
        self.algorithm.block_size()
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// A resolved cipher. `Owned` handles come from a fetch and keep the
/// implementation alive; `Borrowed` handles point into the static legacy
/// table. Dropping the handle is the release.
#[derive(Clone)]
pub enum CipherRef {
    Owned(Arc<CipherDescriptor>),
    Borrowed(&'static CipherDescriptor),
}

impl CipherRef {
    pub fn is_owned(&self) -> bool {
        matches!(self, CipherRef::Owned(_))
    }

    pub fn descriptor(&self) -> &CipherDescriptor {
        match self {
            CipherRef::Owned(arc) => arc,
            CipherRef::Borrowed(desc) => desc,
        }
    }
}

impl Deref for CipherRef {
    type Target = CipherDescriptor;

    fn deref(&self) -> &CipherDescriptor {
        self.descriptor()
    }
}

impl fmt::Debug for CipherRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_owned() { "Owned" } else { "Borrowed" };
        f.debug_tuple(tag).field(&self.name).finish()
    }
}

/// Outcome of a single resolution path
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(CipherRef),
    Unresolved,
}

impl Resolution {
    pub fn or_else(self, f: impl FnOnce() -> Resolution) -> Resolution {
        match self {
            Resolution::Resolved(_) => self,
            Resolution::Unresolved => f(),
        }
    }

    pub fn into_option(self) -> Option<CipherRef> {
        match self {
            Resolution::Resolved(cipher) => Some(cipher),
            Resolution::Unresolved => None,
        }
    }
}

pub trait CipherRegistry: Send + Sync {
    /// Fetch an implementation by name subject to `query`.
    fn fetch(&self, name: &str, query: &PropertyQuery) -> Resolution;

    /// Name-only lookup in the legacy table.
    fn legacy_lookup(&self, name: &str) -> Resolution;
}

const DEFAULT_PROVIDER: &[Property] = &[("provider", "default")];
const FIPS_PROVIDER: &[Property] = &[("provider", "fips"), ("fips", "yes")];

macro_rules! descriptor {
    ($name:literal, [$($alias:literal),*], $alg:ident, $mode:ident, $props:expr) => {
        CipherDescriptor {
            name: $name,
            aliases: &[$($alias),*],
            algorithm: BlockCipher::$alg,
            mode: CipherMode::$mode,
            properties: $props,
        }
    };
}

static LEGACY_TABLE: [CipherDescriptor; 9] = [
    descriptor!("AES-128-ECB", ["aes-128-ecb"], Aes128, Ecb, &[]),
    descriptor!("AES-192-ECB", ["aes-192-ecb"], Aes192, Ecb, &[]),
    descriptor!("AES-256-ECB", ["aes-256-ecb"], Aes256, Ecb, &[]),
    descriptor!("AES-128-CBC", ["aes128", "aes-128"], Aes128, Cbc, &[]),
    descriptor!("AES-192-CBC", ["aes192", "aes-192"], Aes192, Cbc, &[]),
    descriptor!("AES-256-CBC", ["aes256", "aes-256"], Aes256, Cbc, &[]),
    descriptor!("AES-128-GCM", ["id-aes128-GCM"], Aes128, Gcm, &[]),
    descriptor!("AES-192-GCM", ["id-aes192-GCM"], Aes192, Gcm, &[]),
    descriptor!("AES-256-GCM", ["id-aes256-GCM"], Aes256, Gcm, &[]),
];

/// The built-in registry: default-provider implementations of every AES
/// mode plus FIPS-flagged CBC and GCM implementations.
pub struct DefaultCipherRegistry {
    implementations: Vec<Arc<CipherDescriptor>>,
}

impl DefaultCipherRegistry {
    pub fn new() -> Self {
        let implementations = vec![
            descriptor!("AES-128-ECB", [], Aes128, Ecb, DEFAULT_PROVIDER),
            descriptor!("AES-192-ECB", [], Aes192, Ecb, DEFAULT_PROVIDER),
            descriptor!("AES-256-ECB", [], Aes256, Ecb, DEFAULT_PROVIDER),
            descriptor!("AES-128-CBC", [], Aes128, Cbc, DEFAULT_PROVIDER),
            descriptor!("AES-192-CBC", [], Aes192, Cbc, DEFAULT_PROVIDER),
            descriptor!("AES-256-CBC", [], Aes256, Cbc, DEFAULT_PROVIDER),
            descriptor!("AES-128-GCM", [], Aes128, Gcm, DEFAULT_PROVIDER),
            descriptor!("AES-192-GCM", [], Aes192, Gcm, DEFAULT_PROVIDER),
            descriptor!("AES-256-GCM", [], Aes256, Gcm, DEFAULT_PROVIDER),
            descriptor!("AES-128-CBC", [], Aes128, Cbc, FIPS_PROVIDER),
            descriptor!("AES-192-CBC", [], Aes192, Cbc, FIPS_PROVIDER),
            descriptor!("AES-256-CBC", [], Aes256, Cbc, FIPS_PROVIDER),
            descriptor!("AES-128-GCM", [], Aes128, Gcm, FIPS_PROVIDER),
            descriptor!("AES-192-GCM", [], Aes192, Gcm, FIPS_PROVIDER),
            descriptor!("AES-256-GCM", [], Aes256, Gcm, FIPS_PROVIDER),
        ];
        Self {
            implementations: implementations.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build a registry from an explicit implementation list.
    pub fn with_implementations(implementations: Vec<CipherDescriptor>) -> Self {
        Self {
            implementations: implementations.into_iter().map(Arc::new).collect(),
        }
    }
}

impl Default for DefaultCipherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CipherRegistry for DefaultCipherRegistry {
    fn fetch(&self, name: &str, query: &PropertyQuery) -> Resolution {
        let mut best: Option<(&Arc<CipherDescriptor>, usize)> = None;
        for imp in &self.implementations {
            if !imp.answers_to(name) || !query.matches(imp.properties) {
                continue;
            }
            let score = query.preference_score(imp.properties);
            // ties keep the earlier registration
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((imp, score));
            }
        }
        match best {
            Some((imp, _)) => Resolution::Resolved(CipherRef::Owned(Arc::clone(imp))),
            None => Resolution::Unresolved,
        }
    }

    fn legacy_lookup(&self, name: &str) -> Resolution {
        LEGACY_TABLE
            .iter()
            .find(|desc| desc.answers_to(name))
            .map_or(Resolution::Unresolved, |desc| {
                Resolution::Resolved(CipherRef::Borrowed(desc))
            })
    }
}
