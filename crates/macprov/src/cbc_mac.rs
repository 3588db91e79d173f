//! CMAC computation state over the resolved block cipher
//!
//! The chaining and subkey derivation come from the `cmac` crate. This
//! module owns the state machine around it:
//! ```text
//! Unbound ──init(cipher)──▶ Unkeyed ──key──▶ Active ──finalize──▶ Finalized
//!                                              ▲                      │
//!                                              └──── init (reset) ────┘
//! ```

use aes::{Aes128, Aes192, Aes256};
use cmac::{Cmac, Mac};
use macprov_core::{MacError, MacResult};

use crate::cipher::{BlockCipher, CipherMode};
use crate::resolver::CipherBinding;

/// Keyed CMAC accumulator for one concrete block cipher.
#[derive(Clone)]
pub(crate) enum CmacCore {
    Aes128(Cmac<Aes128>),
    Aes192(Cmac<Aes192>),
    Aes256(Cmac<Aes256>),
}

impl CmacCore {
    /// Derive subkeys for `binding` under `key`.
    pub(crate) fn bind(binding: &CipherBinding, key: &[u8]) -> MacResult<Self> {
        let cipher = &binding.cipher;
        if cipher.mode == CipherMode::Gcm {
            return Err(MacError::BindingFailure(format!(
                "{} is not a block cipher mode usable for CMAC",
                cipher.name
            )));
        }
        if let Some(engine) = &binding.engine {
            if !engine.supports(cipher) {
                return Err(MacError::BindingFailure(format!(
                    "engine '{}' does not implement {}",
                    engine.id, cipher.name
                )));
            }
        }
        if key.len() != cipher.key_len() {
            return Err(MacError::BindingFailure(format!(
                "{} needs a {}-byte key, got {}",
                cipher.name,
                cipher.key_len(),
                key.len()
            )));
        }

        let invalid = |_: cmac::digest::InvalidLength| {
            MacError::BindingFailure(format!("{} rejected the key", cipher.name))
        };
        let core = match cipher.algorithm {
            BlockCipher::Aes128 => {
                CmacCore::Aes128(<Cmac<Aes128> as Mac>::new_from_slice(key).map_err(invalid)?)
            }
            BlockCipher::Aes192 => {
                CmacCore::Aes192(<Cmac<Aes192> as Mac>::new_from_slice(key).map_err(invalid)?)
            }
            BlockCipher::Aes256 => {
                CmacCore::Aes256(<Cmac<Aes256> as Mac>::new_from_slice(key).map_err(invalid)?)
            }
        };
        Ok(core)
    }

    fn absorb(&mut self, data: &[u8]) {
        match self {
            CmacCore::Aes128(mac) => mac.update(data),
            CmacCore::Aes192(mac) => mac.update(data),
            CmacCore::Aes256(mac) => mac.update(data),
        }
    }

    /// Pad, mix in the final subkey and write the tag into `out`.
    fn drain(self, out: &mut [u8]) -> usize {
        let tag = match self {
            CmacCore::Aes128(mac) => mac.finalize().into_bytes(),
            CmacCore::Aes192(mac) => mac.finalize().into_bytes(),
            CmacCore::Aes256(mac) => mac.finalize().into_bytes(),
        };
        out[..tag.len()].copy_from_slice(&tag);
        tag.len()
    }
}

#[derive(Clone, Default)]
pub(crate) enum CbcMacState {
    #[default]
    Unbound,
    /// Cipher chosen, waiting for a key.
    Unkeyed(CipherBinding),
    Active {
        binding: CipherBinding,
        /// Freshly keyed state, kept so init can restart without the key.
        initial: CmacCore,
        running: CmacCore,
    },
    Finalized {
        binding: CipherBinding,
        initial: CmacCore,
    },
}

impl CbcMacState {
    pub(crate) fn binding(&self) -> Option<&CipherBinding> {
        match self {
            CbcMacState::Unbound => None,
            CbcMacState::Unkeyed(binding)
            | CbcMacState::Active { binding, .. }
            | CbcMacState::Finalized { binding, .. } => Some(binding),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self, CbcMacState::Active { .. })
    }

    /// Bind key material.
    ///
    /// `staged` replaces the cipher currently held by the state. With a key
    /// the state becomes `Active`. Without one, a staged cipher leaves the
    /// state `Unkeyed`, and no staged cipher restarts a keyed computation
    /// (an unkeyed state has nothing to restart). On error the state is
    /// left untouched.
    pub(crate) fn init(
        &mut self,
        staged: Option<CipherBinding>,
        key: Option<&[u8]>,
    ) -> MacResult<()> {
        let restaged = staged.is_some();
        let binding = match staged {
            Some(binding) => binding,
            None => self
                .binding()
                .cloned()
                .ok_or(MacError::NotConfigured("no cipher has been selected"))?,
        };

        match key {
            Some(key) => {
                let initial = CmacCore::bind(&binding, key)?;
                tracing::debug!(cipher = binding.cipher.name, "CMAC key bound");
                *self = CbcMacState::Active {
                    binding,
                    running: initial.clone(),
                    initial,
                };
            }
            None if restaged => *self = CbcMacState::Unkeyed(binding),
            None => {
                *self = match std::mem::take(self) {
                    CbcMacState::Active {
                        binding, initial, ..
                    }
                    | CbcMacState::Finalized { binding, initial } => CbcMacState::Active {
                        binding,
                        running: initial.clone(),
                        initial,
                    },
                    other => {
                        *self = other;
                        return Err(MacError::InvalidState("MAC not initialized with a key"));
                    }
                };
            }
        }
        Ok(())
    }

    pub(crate) fn absorb(&mut self, data: &[u8]) -> MacResult<()> {
        match self {
            CbcMacState::Active { running, .. } => {
                running.absorb(data);
                Ok(())
            }
            CbcMacState::Finalized { .. } => Err(MacError::InvalidState("MAC already finalized")),
            _ => Err(MacError::InvalidState("MAC not initialized with a key")),
        }
    }

    /// Write the tag into `out`. Fails without touching `out` or the state
    /// when `out` is shorter than the block size.
    pub(crate) fn drain(&mut self, out: &mut [u8]) -> MacResult<usize> {
        let needed = match self {
            CbcMacState::Active { binding, .. } => binding.cipher.block_size(),
            CbcMacState::Finalized { .. } => {
                return Err(MacError::InvalidState("MAC already finalized"))
            }
            _ => return Err(MacError::InvalidState("MAC not initialized with a key")),
        };
        if out.len() < needed {
            return Err(MacError::BufferTooSmall {
                needed,
                capacity: out.len(),
            });
        }

        match std::mem::take(self) {
            CbcMacState::Active {
                binding,
                initial,
                running,
            } => {
                let written = running.drain(out);
                *self = CbcMacState::Finalized { binding, initial };
                Ok(written)
            }
            other => {
                *self = other;
                Err(MacError::InvalidState("MAC not initialized with a key"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderContext;

    const RFC4493_KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];

    fn binding(name: &str) -> CipherBinding {
        ProviderContext::standard().resolve(name, None, None).unwrap()
    }

    #[test]
    fn test_unbound_init_is_not_configured() {
        let mut state = CbcMacState::default();
        assert!(matches!(
            state.init(None, Some(&RFC4493_KEY)),
            Err(MacError::NotConfigured(_))
        ));
        assert!(state.binding().is_none());
    }

    #[test]
    fn test_staged_cipher_without_key_is_unkeyed() {
        let mut state = CbcMacState::default();
        state.init(Some(binding("AES-128-CBC")), None).unwrap();
        assert!(matches!(state, CbcMacState::Unkeyed(_)));
        assert!(matches!(
            state.absorb(b"x"),
            Err(MacError::InvalidState(_))
        ));

        assert!(matches!(
            state.init(None, None),
            Err(MacError::InvalidState(_))
        ));
        assert!(matches!(state, CbcMacState::Unkeyed(_)));

        // the key binds to the cipher already held
        state.init(None, Some(&RFC4493_KEY)).unwrap();
        assert!(state.is_active());
    }

    #[test]
    fn test_gcm_cipher_rejected() {
        let err = CmacCore::bind(&binding("AES-128-GCM"), &RFC4493_KEY).err().unwrap();
        assert!(matches!(err, MacError::BindingFailure(_)));
    }

    #[test]
    fn test_wrong_key_length_rejected_and_state_kept() {
        let mut state = CbcMacState::default();
        state
            .init(Some(binding("AES-128-CBC")), Some(&RFC4493_KEY))
            .unwrap();
        let err = state
            .init(Some(binding("AES-256-CBC")), Some(&RFC4493_KEY))
            .unwrap_err();
        assert!(matches!(err, MacError::BindingFailure(_)));
        assert_eq!(state.binding().unwrap().cipher.name, "AES-128-CBC");
        assert!(state.is_active());
    }

    #[test]
    fn test_drain_then_reinit_restarts() {
        let mut state = CbcMacState::default();
        state
            .init(Some(binding("AES-128-CBC")), Some(&RFC4493_KEY))
            .unwrap();
        let mut first = [0u8; 16];
        state.drain(&mut first).unwrap();
        assert!(matches!(state.absorb(b""), Err(MacError::InvalidState(_))));

        state.init(None, None).unwrap();
        let mut second = [0u8; 16];
        state.drain(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_buffer_leaves_state_active() {
        let mut state = CbcMacState::default();
        state
            .init(Some(binding("AES-128-CBC")), Some(&RFC4493_KEY))
            .unwrap();
        let mut short = [0xAAu8; 15];
        assert!(matches!(
            state.drain(&mut short),
            Err(MacError::BufferTooSmall {
                needed: 16,
                capacity: 15
            })
        ));
        assert_eq!(short, [0xAAu8; 15]);
        assert!(state.is_active());
    }
}
