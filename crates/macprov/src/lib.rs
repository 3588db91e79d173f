//! macprov: provider-style MAC contexts over dynamically resolved block ciphers
//!
//! A host creates a [`ProviderContext`] (resolution mode, default property
//! query, cipher and engine registries) and then one context per MAC
//! computation:
//! ```text
//! CmacContext::new(provider)
//!   ├── set_params(cipher [, engine] [, properties])   stage a cipher
//!   ├── set_params(key) | init(Some(key))               bind, clear staging
//!   ├── update(bytes)*
//!   └── finalize(out)                                   terminal until re-init
//! ```
//!
//! Cipher resolution tries a property-query fetch first and falls back to a
//! legacy name table; restricted mode disables the fallback and engines.

mod cbc_mac;
pub mod cipher;
pub mod cmac;
pub mod engine;
pub mod gmac;
pub mod mac;
pub mod properties;
pub mod provider;
pub mod resolver;

pub use cipher::{
    BlockCipher, CipherDescriptor, CipherMode, CipherRef, CipherRegistry, DefaultCipherRegistry,
    Resolution,
};
pub use cmac::CmacContext;
pub use engine::{DefaultEngineRegistry, Engine, EngineHandle, EngineRegistry};
pub use gmac::{GmacContext, GMAC_IV_SIZE, GMAC_TAG_SIZE};
pub use mac::{cmac, gmac, MacContext};
pub use properties::PropertyQuery;
pub use provider::ProviderContext;
pub use resolver::CipherBinding;

pub use macprov_core::{MacError, MacResult, ResolutionMode};
