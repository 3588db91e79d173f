//! GMAC context: AES-GCM authentication tag over data with no plaintext
//!
//! The selected cipher must be a GCM mode. Unlike CMAC the cipher stays
//! attached to the context across `init`, and the key must match the
//! cipher's key length exactly.
//!
//! Authenticated data is streamed through GHASH as it arrives. Only a
//! partial trailing block is ever buffered, so the context stays the same
//! size however much data it absorbs.

use std::sync::Arc;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use ghash::universal_hash::UniversalHash;
use ghash::{Block, GHash};
use macprov_core::params::{
    Param, ParamDescriptor, MAC_PARAM_CIPHER, MAC_PARAM_ENGINE, MAC_PARAM_IV, MAC_PARAM_KEY,
    MAC_PARAM_PROPERTIES, MAC_PARAM_SIZE,
};
use macprov_core::{MacError, MacResult};
use zeroize::Zeroize;

use crate::cipher::{BlockCipher, CipherMode};
use crate::mac::MacContext;
use crate::provider::ProviderContext;
use crate::resolver::CipherBinding;

/// GCM authentication tag length
pub const GMAC_TAG_SIZE: usize = 16;

/// IV length that maps directly onto the counter block (96-bit). Other
/// non-empty lengths are accepted and hashed into the counter block.
pub const GMAC_IV_SIZE: usize = 12;

const BLOCK_SIZE: usize = 16;

/// GCM bounds authenticated data at 2^64 - 1 bits.
const MAX_AAD_BYTES: u64 = u64::MAX / 8;

static GETTABLE: [ParamDescriptor; 1] = [ParamDescriptor::size_t(MAC_PARAM_SIZE)];

static SETTABLE: [ParamDescriptor; 5] = [
    ParamDescriptor::utf8_string(MAC_PARAM_CIPHER),
    ParamDescriptor::utf8_string(MAC_PARAM_ENGINE),
    ParamDescriptor::utf8_string(MAC_PARAM_PROPERTIES),
    ParamDescriptor::octet_string(MAC_PARAM_KEY),
    ParamDescriptor::octet_string(MAC_PARAM_IV),
];

#[derive(Clone)]
enum AesBlock {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesBlock {
    fn new(algorithm: BlockCipher, key: &[u8]) -> MacResult<Self> {
        let invalid = |_: aes::cipher::InvalidLength| {
            MacError::BindingFailure("AES rejected the key".into())
        };
        let cipher = match algorithm {
            BlockCipher::Aes128 => Aes128::new_from_slice(key).map(Self::Aes128),
            BlockCipher::Aes192 => Aes192::new_from_slice(key).map(Self::Aes192),
            BlockCipher::Aes256 => Aes256::new_from_slice(key).map(Self::Aes256),
        };
        cipher.map_err(invalid)
    }

    fn encrypt(&self, block: &mut Block) {
        match self {
            AesBlock::Aes128(c) => c.encrypt_block(block),
            AesBlock::Aes192(c) => c.encrypt_block(block),
            AesBlock::Aes256(c) => c.encrypt_block(block),
        }
    }
}

/// Running GHASH over the authenticated data, keyed with H = E_K(0^128).
#[derive(Clone)]
struct GhashStream {
    cipher: AesBlock,
    /// Keyed but unfed, kept so a restart needs no key.
    fresh: GHash,
    running: GHash,
    partial: [u8; BLOCK_SIZE],
    partial_len: usize,
    aad_len: u64,
}

impl GhashStream {
    fn new(algorithm: BlockCipher, key: &[u8]) -> MacResult<Self> {
        let cipher = AesBlock::new(algorithm, key)?;
        let mut h = Block::default();
        cipher.encrypt(&mut h);
        let fresh = GHash::new(&h);
        h.as_mut_slice().zeroize();
        Ok(Self {
            cipher,
            running: fresh.clone(),
            fresh,
            partial: [0u8; BLOCK_SIZE],
            partial_len: 0,
            aad_len: 0,
        })
    }

    fn restart(&mut self) {
        self.running = self.fresh.clone();
        self.partial = [0u8; BLOCK_SIZE];
        self.partial_len = 0;
        self.aad_len = 0;
    }

    fn absorb(&mut self, mut data: &[u8]) -> MacResult<()> {
        self.aad_len = self
            .aad_len
            .checked_add(data.len() as u64)
            .filter(|&n| n <= MAX_AAD_BYTES)
            .ok_or(MacError::InvalidState("GMAC input length limit exceeded"))?;

        if self.partial_len > 0 {
            let take = (BLOCK_SIZE - self.partial_len).min(data.len());
            self.partial[self.partial_len..self.partial_len + take]
                .copy_from_slice(&data[..take]);
            self.partial_len += take;
            data = &data[take..];
            if self.partial_len < BLOCK_SIZE {
                return Ok(());
            }
            self.running.update(&[Block::clone_from_slice(&self.partial)]);
            self.partial_len = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            self.running.update(&[Block::clone_from_slice(block)]);
        }
        let rest = blocks.remainder();
        self.partial[..rest.len()].copy_from_slice(rest);
        self.partial_len = rest.len();
        Ok(())
    }

    /// Pre-counter block J0 for `iv`.
    fn counter_block(&self, iv: &[u8]) -> Block {
        if iv.len() == GMAC_IV_SIZE {
            let mut j0 = Block::default();
            j0[..GMAC_IV_SIZE].copy_from_slice(iv);
            j0[BLOCK_SIZE - 1] = 1;
            return j0;
        }
        let mut ghash = self.fresh.clone();
        ghash.update_padded(iv);
        let mut lengths = Block::default();
        lengths[8..].copy_from_slice(&bit_len(iv.len() as u64).to_be_bytes());
        ghash.update(&[lengths]);
        ghash.finalize()
    }

    fn tag(&self, iv: &[u8]) -> [u8; GMAC_TAG_SIZE] {
        let mut ghash = self.running.clone();
        if self.partial_len > 0 {
            ghash.update_padded(&self.partial[..self.partial_len]);
        }
        let mut lengths = Block::default();
        lengths[..8].copy_from_slice(&bit_len(self.aad_len).to_be_bytes());
        ghash.update(&[lengths]);
        let digest = ghash.finalize();

        let mut mask = self.counter_block(iv);
        self.cipher.encrypt(&mut mask);

        let mut tag = [0u8; GMAC_TAG_SIZE];
        for ((t, d), m) in tag.iter_mut().zip(digest.iter()).zip(mask.iter()) {
            *t = d ^ m;
        }
        tag
    }
}

fn bit_len(bytes: u64) -> u64 {
    bytes.wrapping_mul(8)
}

#[derive(Clone)]
pub struct GmacContext {
    provider: Arc<ProviderContext>,
    binding: Option<CipherBinding>,
    /// Present once a key is bound.
    stream: Option<GhashStream>,
    iv: Option<Vec<u8>>,
    finalized: bool,
}

impl GmacContext {
    fn set_cipher(&mut self, binding: CipherBinding) -> MacResult<()> {
        let cipher = &binding.cipher;
        if cipher.mode != CipherMode::Gcm {
            return Err(MacError::BindingFailure(format!(
                "{} is not a GCM mode cipher",
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
        // a new cipher invalidates key material sized for the old one
        self.stream = None;
        self.binding = Some(binding);
        Ok(())
    }

    fn set_key(&mut self, key: &[u8]) -> MacResult<()> {
        let binding = self
            .binding
            .as_ref()
            .ok_or(MacError::NotConfigured("key set before any cipher"))?;
        let expected = binding.cipher.key_len();
        if key.len() != expected {
            return Err(MacError::BindingFailure(format!(
                "{} needs a {expected}-byte key, got {}",
                binding.cipher.name,
                key.len()
            )));
        }
        self.stream = Some(GhashStream::new(binding.cipher.algorithm, key)?);
        self.finalized = false;
        tracing::debug!(cipher = binding.cipher.name, "GMAC key bound");
        Ok(())
    }

    fn set_iv(&mut self, iv: &[u8]) -> MacResult<()> {
        if iv.is_empty() {
            return Err(MacError::BindingFailure("GMAC IV must not be empty".into()));
        }
        self.iv = Some(iv.to_vec());
        Ok(())
    }

    fn live_stream(&mut self) -> MacResult<&mut GhashStream> {
        if self.finalized {
            return Err(MacError::InvalidState("MAC already finalized"));
        }
        self.stream
            .as_mut()
            .ok_or(MacError::InvalidState("MAC not initialized with a key"))
    }

    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.partial_len)
    }
}

impl MacContext for GmacContext {
    fn new(provider: Arc<ProviderContext>) -> MacResult<Self> {
        Ok(Self {
            provider,
            binding: None,
            stream: None,
            iv: None,
            finalized: false,
        })
    }

    fn duplicate(&self) -> MacResult<Self> {
        tracing::trace!(
            keyed = self.stream.is_some(),
            finalized = self.finalized,
            "duplicating GMAC context"
        );
        Ok(self.clone())
    }

    fn init(&mut self, key: Option<&[u8]>) -> MacResult<()> {
        if self.binding.is_none() {
            return Err(MacError::NotConfigured("no cipher has been selected"));
        }
        match key {
            Some(key) => self.set_key(key),
            None => {
                let stream = self
                    .stream
                    .as_mut()
                    .ok_or(MacError::InvalidState("MAC not initialized with a key"))?;
                stream.restart();
                self.finalized = false;
                Ok(())
            }
        }
    }

    fn update(&mut self, data: &[u8]) -> MacResult<()> {
        self.live_stream()?.absorb(data)
    }

    fn finalize(&mut self, out: &mut [u8]) -> MacResult<usize> {
        self.live_stream()?;
        if out.len() < GMAC_TAG_SIZE {
            return Err(MacError::BufferTooSmall {
                needed: GMAC_TAG_SIZE,
                capacity: out.len(),
            });
        }
        let (Some(stream), Some(iv)) = (&self.stream, &self.iv) else {
            return Err(MacError::NotConfigured("GMAC IV not set"));
        };

        out[..GMAC_TAG_SIZE].copy_from_slice(&stream.tag(iv));
        self.finalized = true;
        Ok(GMAC_TAG_SIZE)
    }

    fn size(&self) -> MacResult<usize> {
        Ok(GMAC_TAG_SIZE)
    }

    fn gettable_params() -> &'static [ParamDescriptor] {
        &GETTABLE
    }

    fn get_params(&self, params: &mut [Param]) -> MacResult<()> {
        if let Some(p) = Param::locate_mut(params, MAC_PARAM_SIZE) {
            p.set_size_t(self.size()?)?;
        }
        Ok(())
    }

    fn settable_params() -> &'static [ParamDescriptor] {
        &SETTABLE
    }

    fn set_params(&mut self, params: &[Param]) -> MacResult<()> {
        if let Some(binding) = self.provider.resolve_params(params)? {
            self.set_cipher(binding)?;
        }
        if let Some(p) = Param::locate(params, MAC_PARAM_KEY) {
            let key = p.as_octet_string()?;
            self.set_key(key)?;
        }
        if let Some(p) = Param::locate(params, MAC_PARAM_IV) {
            let iv = p.as_octet_string()?;
            self.set_iv(iv)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(cipher: &str) -> GmacContext {
        let mut ctx = GmacContext::new(ProviderContext::standard()).unwrap();
        ctx.set_params(&[Param::utf8_string(MAC_PARAM_CIPHER, cipher)])
            .unwrap();
        ctx
    }

    #[test]
    fn test_non_gcm_cipher_rejected() {
        let mut ctx = GmacContext::new(ProviderContext::standard()).unwrap();
        let err = ctx
            .set_params(&[Param::utf8_string(MAC_PARAM_CIPHER, "AES-128-CBC")])
            .unwrap_err();
        assert!(matches!(err, MacError::BindingFailure(_)));
    }

    #[test]
    fn test_key_length_must_match_cipher() {
        let mut ctx = ctx_with("AES-256-GCM");
        let err = ctx.init(Some(&[0u8; 16])).unwrap_err();
        assert!(matches!(err, MacError::BindingFailure(_)));
        ctx.init(Some(&[0u8; 32])).unwrap();
    }

    #[test]
    fn test_empty_iv_rejected() {
        let mut ctx = ctx_with("AES-128-GCM");
        let err = ctx
            .set_params(&[Param::octet_string(MAC_PARAM_IV, Vec::new())])
            .unwrap_err();
        assert!(matches!(err, MacError::BindingFailure(_)));
        ctx.set_params(&[Param::octet_string(MAC_PARAM_IV, vec![0u8; 16])])
            .unwrap();
    }

    #[test]
    fn test_buffer_holds_at_most_a_partial_block() {
        let mut ctx = ctx_with("AES-128-GCM");
        ctx.set_params(&[Param::octet_string(MAC_PARAM_IV, vec![0u8; 12])])
            .unwrap();
        ctx.init(Some(&[5u8; 16])).unwrap();

        let chunk = vec![0x5au8; (1 << 16) + 7];
        for _ in 0..8 {
            ctx.update(&chunk).unwrap();
            assert!(ctx.buffered_len() < BLOCK_SIZE);
        }
        assert_eq!(ctx.buffered_len(), (8 * 7) % BLOCK_SIZE);

        let copy = ctx.duplicate().unwrap();
        assert_eq!(copy.buffered_len(), ctx.buffered_len());
    }

    #[test]
    fn test_reinit_without_key_is_invalid_state() {
        let mut ctx = ctx_with("AES-128-GCM");
        assert!(matches!(ctx.init(None), Err(MacError::InvalidState(_))));
    }

    #[test]
    fn test_update_before_key_is_invalid_state() {
        let mut ctx = ctx_with("AES-128-GCM");
        assert!(matches!(
            ctx.update(b"data"),
            Err(MacError::InvalidState(_))
        ));
    }

    #[test]
    fn test_finalize_without_iv_is_not_configured() {
        let mut ctx = ctx_with("AES-128-GCM");
        ctx.init(Some(&[0u8; 16])).unwrap();
        let mut out = [0u8; GMAC_TAG_SIZE];
        assert!(matches!(
            ctx.finalize(&mut out),
            Err(MacError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_zero_key_zero_iv_empty_aad() {
        // GCM spec test case 1
        let mut ctx = ctx_with("AES-128-GCM");
        ctx.set_params(&[Param::octet_string(MAC_PARAM_IV, vec![0u8; 12])])
            .unwrap();
        ctx.init(Some(&[0u8; 16])).unwrap();
        let tag = ctx.finalize_vec().unwrap();
        assert_eq!(
            tag,
            [
                0x58, 0xe2, 0xfc, 0xce, 0xfa, 0x7e, 0x30, 0x61, 0x36, 0x7f, 0x1d, 0x57, 0xa4, 0xe7,
                0x45, 0x5a
            ]
        );
    }

    #[test]
    fn test_changing_cipher_drops_key() {
        let mut ctx = ctx_with("AES-128-GCM");
        ctx.init(Some(&[1u8; 16])).unwrap();
        ctx.set_params(&[Param::utf8_string(MAC_PARAM_CIPHER, "AES-256-GCM")])
            .unwrap();
        assert!(matches!(
            ctx.update(b"x"),
            Err(MacError::InvalidState(_))
        ));
    }
}
