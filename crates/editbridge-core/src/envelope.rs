//! Wire envelopes exchanged between the bridge client and the editor dispatcher.
//!
//! Every transport frame carries exactly one JSON document:
//!
//! ```json
//! { "id": "k3Jd9aQx-1", "method": "getWorkspaceInfo", "params": {} }
//! { "id": "k3Jd9aQx-1", "result": { "hasWorkspace": false, "message": "No workspace open" } }
//! ```
//!
//! Failures travel inside `result` as `{ "error": "<reason>" }`. [`Outcome`] is the
//! tagged view of a result so callers never have to look for the `error` key themselves.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::ProtocolError;

/// Reason reported when a result says `success: false` without naming an error.
pub const UNSPECIFIED_FAILURE: &str = "request failed";

/// Correlation token linking a request frame to its response frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an existing identifier.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// An empty params object, the value used whenever a request omits `params`.
#[inline]
pub fn empty_params() -> Value {
    Value::Object(Map::new())
}

fn params_or_empty<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let params = Option::<Value>::deserialize(deserializer)?;
    Ok(match params {
        None | Some(Value::Null) => empty_params(),
        Some(params) => params,
    })
}

/// Request envelope: `{ id, method, params }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id echoed by the response
    pub id: RequestId,
    /// Method name looked up in the dispatcher's registry
    pub method: String,
    /// Method-specific parameters, `{}` when absent
    #[serde(default = "empty_params", deserialize_with = "params_or_empty")]
    pub params: Value,
}

impl Request {
    /// Build a request, substituting `{}` for `null` params.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        let params = if params.is_null() {
            empty_params()
        } else {
            params
        };
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Decode a request from a text frame.
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a request from a binary frame holding UTF-8 JSON.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::from_text(text)
    }

    /// Encode the request as a single JSON document.
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Response envelope: `{ id, result }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the originating request
    pub id: RequestId,
    /// Handler result; `null` is a legal value
    #[serde(default)]
    pub result: Value,
}

impl Response {
    /// A response carrying a plain result value.
    pub fn ok(id: RequestId, result: Value) -> Self {
        Self { id, result }
    }

    /// A response reporting a failure as `{ "error": reason }`.
    pub fn failure(id: RequestId, reason: impl Into<String>) -> Self {
        Self::from_outcome(id, Outcome::Err(reason.into()))
    }

    /// A response reporting an operation the editor refused, as
    /// `{ "success": false, "error": reason }`.
    pub fn rejected(id: RequestId, reason: impl Into<String>) -> Self {
        Self {
            id,
            result: serde_json::json!({ "success": false, "error": reason.into() }),
        }
    }

    /// Encode a tagged outcome onto the wire.
    pub fn from_outcome(id: RequestId, outcome: Outcome) -> Self {
        Self {
            id,
            result: outcome.into_wire(),
        }
    }

    /// Tagged view of the result.
    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self.result.clone())
    }

    /// Consume the response into its tagged outcome.
    pub fn into_outcome(self) -> Outcome {
        Outcome::classify(self.result)
    }

    /// Decode a response from a text frame.
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a response from a binary frame holding UTF-8 JSON.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::from_text(text)
    }

    /// Encode the response as a single JSON document.
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Structural success/failure of a single request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The handler produced a value
    Ok(Value),
    /// The request failed; the reason is human readable
    Err(String),
}

impl Outcome {
    /// Classify a raw wire result.
    ///
    /// An object is a failure when it carries a string `error` field and does not
    /// claim `success: true`, or when it says `success: false`. Any other value,
    /// including `null` and arrays, is a success.
    pub fn classify(result: Value) -> Self {
        let failure = match &result {
            Value::Object(map) => {
                let success = map.get("success").and_then(Value::as_bool);
                let error = map.get("error").and_then(Value::as_str);
                match (success, error) {
                    (Some(true), _) => None,
                    (_, Some(reason)) => Some(reason.to_owned()),
                    (Some(false), None) => Some(UNSPECIFIED_FAILURE.to_owned()),
                    (None, None) => None,
                }
            }
            _ => None,
        };

        match failure {
            Some(reason) => Self::Err(reason),
            None => Self::Ok(result),
        }
    }

    /// Wire form of this outcome.
    pub fn into_wire(self) -> Value {
        match self {
            Self::Ok(value) => value,
            Self::Err(reason) => serde_json::json!({ "error": reason }),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    #[inline]
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Err(reason) => Err(reason),
        }
    }
}

impl<E: fmt::Display> From<Result<Value, E>> for Outcome {
    fn from(result: Result<Value, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Err(e.to_string()),
        }
    }
}
