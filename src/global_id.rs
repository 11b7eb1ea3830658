//! Global object identifiers
//!
//! A global id is the base64 encoding of `"<TypeName>:<local id>"`. Tokens are
//! produced with the standard alphabet and padding; decoding tolerates missing
//! padding.
//!
//! The separator is not escaped. A type name containing `:` does not round-trip,
//! since decoding always splits on the first separator. Local ids may contain `:`
//! freely. Changing this would change the wire format of every issued token.

use std::fmt;
use std::str::FromStr;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::RelayError;

/// Separator between the type name and the local id
pub const SEPARATOR: char = ':';

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A decoded global id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedGlobalId {
    pub type_name: String,
    pub id: String,
}

impl ResolvedGlobalId {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Encode back into an opaque token
    pub fn to_global_id(&self) -> String {
        to_global_id(&self.type_name, &self.id)
    }
}

impl fmt::Display for ResolvedGlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_global_id())
    }
}

impl FromStr for ResolvedGlobalId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_global_id(s)
    }
}

/// Build the global id for `id` of type `type_name`
pub fn to_global_id(type_name: &str, id: &str) -> String {
    let mut raw = String::with_capacity(type_name.len() + id.len() + 1);
    raw.push_str(type_name);
    raw.push(SEPARATOR);
    raw.push_str(id);
    BASE64.encode(raw.as_bytes())
}

/// Split a global id back into its type name and local id
pub fn from_global_id(global_id: &str) -> crate::Result<ResolvedGlobalId> {
    let bytes = LENIENT_BASE64
        .decode(global_id.as_bytes())
        .map_err(|e| RelayError::InvalidGlobalId(e.to_string()))?;
    let raw = String::from_utf8(bytes).map_err(|e| RelayError::InvalidGlobalId(e.to_string()))?;

    let (type_name, id) = raw
        .split_once(SEPARATOR)
        .ok_or_else(|| RelayError::InvalidGlobalId(format!("missing '{SEPARATOR}' separator")))?;

    Ok(ResolvedGlobalId::new(type_name, id))
}
