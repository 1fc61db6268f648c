//! The `{"data": value}` container exchanged with every plugin.
//!
//! Requests are serialised as compact JSON objects holding exactly one field,
//! `data`. Responses are decoded into a generic [`RawResponse`] mapping; the
//! shape of the `data` value is never validated here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PluginError;

/// Name reported in decode errors raised outside of a plugin call.
const DETACHED_NAME: &str = "<envelope>";

/// Generic key-valued mapping decoded from a plugin's standard output.
pub type RawResponse = Map<String, Value>;

/// Single-field container wrapping every request and response payload.
///
/// # Example
///
/// ```
/// use stencil_plugins::envelope::Envelope;
///
/// let json = serde_json::to_string(&Envelope::new("hello")).unwrap();
/// assert_eq!(json, r#"{"data":"hello"}"#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    /// The wrapped payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wraps a payload.
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { data }
    }

    /// Returns the wrapped payload.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Serialises `value` as `{"data": value}`.
///
/// # Errors
///
/// Returns [`PluginError::Encode`] if `value` cannot be represented as JSON,
/// for example a map with non-string keys.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PluginError> {
    serde_json::to_vec(&Envelope::new(value)).map_err(PluginError::Encode)
}

/// Parses plugin output into a generic mapping.
///
/// # Errors
///
/// Returns [`PluginError::Decode`] if `bytes` are not a well-formed JSON
/// object.
pub fn decode(bytes: &[u8]) -> Result<RawResponse, PluginError> {
    decode_from(DETACHED_NAME, bytes)
}

pub(crate) fn decode_from(name: &str, bytes: &[u8]) -> Result<RawResponse, PluginError> {
    serde_json::from_slice(bytes).map_err(|source| PluginError::Decode {
        name: name.to_owned(),
        source,
    })
}

/// Removes and returns the `data` field of a decoded response.
///
/// # Errors
///
/// Returns [`PluginError::MissingData`] when the field is absent.
pub fn into_data(response: RawResponse) -> Result<Value, PluginError> {
    into_data_from(DETACHED_NAME, response)
}

pub(crate) fn into_data_from(name: &str, mut response: RawResponse) -> Result<Value, PluginError> {
    response
        .remove("data")
        .ok_or_else(|| PluginError::MissingData {
            name: name.to_owned(),
        })
}
