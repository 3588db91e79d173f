//! The uniform MAC context interface and one-shot helpers
//!
//! Lifecycle: `new` → `set_params`* → `init` → `update`* → `finalize`.
//! Dropping a context releases the cipher and engine handles it holds.

use std::sync::Arc;

use macprov_core::params::{Param, ParamDescriptor, MAC_PARAM_CIPHER, MAC_PARAM_IV};
use macprov_core::MacResult;

use crate::cmac::CmacContext;
use crate::gmac::GmacContext;
use crate::provider::ProviderContext;

pub trait MacContext: Sized {
    fn new(provider: Arc<ProviderContext>) -> MacResult<Self>;

    /// Independent copy of the context, including a running computation.
    fn duplicate(&self) -> MacResult<Self>;

    /// Start (or restart) a computation, optionally supplying the key.
    fn init(&mut self, key: Option<&[u8]>) -> MacResult<()>;

    fn update(&mut self, data: &[u8]) -> MacResult<()>;

    /// Write the MAC into `out` and return the number of bytes written.
    fn finalize(&mut self, out: &mut [u8]) -> MacResult<usize>;

    fn size(&self) -> MacResult<usize>;

    fn gettable_params() -> &'static [ParamDescriptor];

    fn get_params(&self, params: &mut [Param]) -> MacResult<()>;

    fn settable_params() -> &'static [ParamDescriptor];

    fn set_params(&mut self, params: &[Param]) -> MacResult<()>;

    /// Finalize into a freshly allocated buffer of exactly `size()` bytes.
    fn finalize_vec(&mut self) -> MacResult<Vec<u8>> {
        let mut out = vec![0u8; self.size()?];
        let written = self.finalize(&mut out)?;
        out.truncate(written);
        Ok(out)
    }
}

/// Compute a CMAC over `data` in one call.
pub fn cmac(
    provider: &Arc<ProviderContext>,
    cipher: &str,
    key: &[u8],
    data: &[u8],
) -> MacResult<Vec<u8>> {
    let mut ctx = CmacContext::new(Arc::clone(provider))?;
    ctx.set_params(&[Param::utf8_string(MAC_PARAM_CIPHER, cipher)])?;
    ctx.init(Some(key))?;
    ctx.update(data)?;
    ctx.finalize_vec()
}

/// Compute a GMAC tag over `data` (authenticated-only input) in one call.
pub fn gmac(
    provider: &Arc<ProviderContext>,
    cipher: &str,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> MacResult<Vec<u8>> {
    let mut ctx = GmacContext::new(Arc::clone(provider))?;
    ctx.set_params(&[
        Param::utf8_string(MAC_PARAM_CIPHER, cipher),
        Param::octet_string(MAC_PARAM_IV, iv),
    ])?;
    ctx.init(Some(key))?;
    ctx.update(data)?;
    ctx.finalize_vec()
}
