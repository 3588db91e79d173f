//! CMAC context (NIST SP 800-38B / RFC 4493)
//!
//! Parameters must be set before `init`. Setting `cipher` (optionally with
//! `engine` and `properties`) stages a resolved cipher; setting `key`, or
//! calling `init` with a key, binds the staged cipher and clears the staging.

use std::sync::Arc;

use macprov_core::params::{
    Param, ParamDescriptor, MAC_PARAM_CIPHER, MAC_PARAM_ENGINE, MAC_PARAM_KEY,
    MAC_PARAM_PROPERTIES, MAC_PARAM_SIZE,
};
use macprov_core::{MacError, MacResult};

use crate::cbc_mac::CbcMacState;
use crate::mac::MacContext;
use crate::provider::ProviderContext;
use crate::resolver::CipherBinding;

static GETTABLE: [ParamDescriptor; 1] = [ParamDescriptor::size_t(MAC_PARAM_SIZE)];

static SETTABLE: [ParamDescriptor; 4] = [
    ParamDescriptor::utf8_string(MAC_PARAM_CIPHER),
    ParamDescriptor::utf8_string(MAC_PARAM_ENGINE),
    ParamDescriptor::utf8_string(MAC_PARAM_PROPERTIES),
    ParamDescriptor::octet_string(MAC_PARAM_KEY),
];

#[derive(Clone)]
pub struct CmacContext {
    provider: Arc<ProviderContext>,
    /// Cipher selected by `set_params`, consumed by the next key binding.
    staged: Option<CipherBinding>,
    state: CbcMacState,
}

impl CmacContext {
    /// The cipher waiting to be bound, if any.
    pub fn staged_cipher(&self) -> Option<&CipherBinding> {
        self.staged.as_ref()
    }

    /// The cipher the running computation uses, if any.
    pub fn bound_cipher(&self) -> Option<&CipherBinding> {
        self.state.binding()
    }

    fn bind(&mut self, key: Option<&[u8]>) -> MacResult<()> {
        let staged = self.staged.take();
        self.state.init(staged, key)
    }
}

impl MacContext for CmacContext {
    fn new(provider: Arc<ProviderContext>) -> MacResult<Self> {
        Ok(Self {
            provider,
            staged: None,
            state: CbcMacState::default(),
        })
    }

    fn duplicate(&self) -> MacResult<Self> {
        tracing::trace!(
            staged = self.staged.is_some(),
            active = self.state.is_active(),
            "duplicating CMAC context"
        );
        Ok(self.clone())
    }

    fn init(&mut self, key: Option<&[u8]>) -> MacResult<()> {
        // staging is single-use even when binding fails
        self.bind(key)
    }

    fn update(&mut self, data: &[u8]) -> MacResult<()> {
        self.state.absorb(data)
    }

    fn finalize(&mut self, out: &mut [u8]) -> MacResult<usize> {
        self.state.drain(out)
    }

    fn size(&self) -> MacResult<usize> {
        self.state
            .binding()
            .or(self.staged.as_ref())
            .map(|b| b.cipher.block_size())
            .ok_or(MacError::NotConfigured("no cipher has been selected"))
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
            // replaces (and releases) whatever was staged before
            self.staged = Some(binding);
        }

        if let Some(p) = Param::locate(params, MAC_PARAM_KEY) {
            let key = p.as_octet_string()?;
            if self.staged.is_none() && self.state.binding().is_none() {
                return Err(MacError::NotConfigured("key set before any cipher"));
            }
            let staged = self.staged.clone();
            self.state.init(staged, Some(key))?;
            self.staged = None;
        }
        Ok(())
    }
}
