//! Typed key/value parameters for MAC context configuration
//!
//! A caller hands a context a slice of [`Param`]s. Each context publishes the
//! keys it understands as [`ParamDescriptor`] tables; unknown keys in a slice
//! are skipped, known keys must carry the declared [`ParamType`].

use std::fmt;

use zeroize::Zeroizing;

use crate::error::{MacError, MacResult};

/// Name of the block cipher to build the MAC over (UTF-8 string)
pub const MAC_PARAM_CIPHER: &str = "cipher";
/// Legacy engine id that implements the cipher (UTF-8 string)
pub const MAC_PARAM_ENGINE: &str = "engine";
/// Property query used when fetching the cipher (UTF-8 string)
pub const MAC_PARAM_PROPERTIES: &str = "properties";
/// Key material (octet string)
pub const MAC_PARAM_KEY: &str = "key";
/// GMAC initialization vector (octet string)
pub const MAC_PARAM_IV: &str = "iv";
/// MAC output size in bytes (size_t)
pub const MAC_PARAM_SIZE: &str = "size";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Utf8String,
    OctetString,
    SizeT,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Utf8String => "utf8 string",
            ParamType::OctetString => "octet string",
            ParamType::SizeT => "size_t",
        };
        f.write_str(name)
    }
}

/// One entry of a gettable/settable table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub key: &'static str,
    pub data_type: ParamType,
}

impl ParamDescriptor {
    pub const fn utf8_string(key: &'static str) -> Self {
        Self {
            key,
            data_type: ParamType::Utf8String,
        }
    }

    pub const fn octet_string(key: &'static str) -> Self {
        Self {
            key,
            data_type: ParamType::OctetString,
        }
    }

    pub const fn size_t(key: &'static str) -> Self {
        Self {
            key,
            data_type: ParamType::SizeT,
        }
    }
}

/// A typed parameter value. Octet strings are zeroized on drop since they
/// usually carry key material.
#[derive(Clone, PartialEq, Eq)]
pub enum ParamValue {
    Utf8String(String),
    OctetString(Zeroizing<Vec<u8>>),
    SizeT(usize),
}

impl ParamValue {
    pub fn data_type(&self) -> ParamType {
        match self {
            ParamValue::Utf8String(_) => ParamType::Utf8String,
            ParamValue::OctetString(_) => ParamType::OctetString,
            ParamValue::SizeT(_) => ParamType::SizeT,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Utf8String(s) => f.debug_tuple("Utf8String").field(s).finish(),
            ParamValue::OctetString(bytes) => f
                .debug_tuple("OctetString")
                .field(&format_args!("[REDACTED; {} bytes]", bytes.len()))
                .finish(),
            ParamValue::SizeT(n) => f.debug_tuple("SizeT").field(n).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: ParamValue,
}

impl Param {
    pub fn utf8_string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ParamValue::Utf8String(value.into()),
        }
    }

    pub fn octet_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: ParamValue::OctetString(Zeroizing::new(value.into())),
        }
    }

    pub fn size_t(key: impl Into<String>, value: usize) -> Self {
        Self {
            key: key.into(),
            value: ParamValue::SizeT(value),
        }
    }

    /// Find the first parameter named `key`.
    pub fn locate<'a>(params: &'a [Param], key: &str) -> Option<&'a Param> {
        params.iter().find(|p| p.key == key)
    }

    pub fn locate_mut<'a>(params: &'a mut [Param], key: &str) -> Option<&'a mut Param> {
        params.iter_mut().find(|p| p.key == key)
    }

    pub fn as_utf8_string(&self) -> MacResult<&str> {
        match &self.value {
            ParamValue::Utf8String(s) => Ok(s.as_str()),
            other => Err(self.type_mismatch(ParamType::Utf8String, other)),
        }
    }

    pub fn as_octet_string(&self) -> MacResult<&[u8]> {
        match &self.value {
            ParamValue::OctetString(bytes) => Ok(bytes.as_slice()),
            other => Err(self.type_mismatch(ParamType::OctetString, other)),
        }
    }

    pub fn as_size_t(&self) -> MacResult<usize> {
        match &self.value {
            ParamValue::SizeT(n) => Ok(*n),
            other => Err(self.type_mismatch(ParamType::SizeT, other)),
        }
    }

    /// Answer a size_t request in place. The requester declares the type by
    /// passing a `SizeT` placeholder.
    pub fn set_size_t(&mut self, value: usize) -> MacResult<()> {
        match &mut self.value {
            ParamValue::SizeT(slot) => {
                *slot = value;
                Ok(())
            }
            other => {
                let found = other.data_type();
                Err(MacError::InvalidParameterType {
                    key: self.key.clone(),
                    expected: ParamType::SizeT,
                    found,
                })
            }
        }
    }

    fn type_mismatch(&self, expected: ParamType, found: &ParamValue) -> MacError {
        MacError::InvalidParameterType {
            key: self.key.clone(),
            expected,
            found: found.data_type(),
        }
    }
}
