//! # JSON-RPC 2.0 Envelope
//!
//! Request and response objects exchanged with the Lotus API.
//!
//! ```rust
//! use filsign::gateway::protocol::{JsonRpcId, JsonRpcRequest};
//!
//! let request = JsonRpcRequest::new("ChainHead", serde_json::json!([]));
//! assert_eq!(request.method, "Filecoin.ChainHead");
//! assert_eq!(request.id, JsonRpcId::Number(1));
//! ```

use filsign_core::error::GatewayError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Namespace prefix of every Lotus API method.
pub const METHOD_PREFIX: &str = "Filecoin.";

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i64 = -32700;

    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;

    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;

    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;

    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Request identifier; the node echoes it back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// Numeric identifier
    Number(i64),
    /// String identifier
    String(String),
    /// Null identifier
    #[default]
    Null,
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: String,

    /// Fully qualified method name, e.g. `Filecoin.MpoolPush`.
    pub method: String,

    /// Positional parameters.
    #[serde(default)]
    pub params: serde_json::Value,

    /// Request identifier.
    pub id: JsonRpcId,
}

impl JsonRpcRequest {
    /// Builds a request for the Lotus method `method` (without prefix).
    #[must_use]
    pub fn new(method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: format!("{METHOD_PREFIX}{method}"),
            params,
            id: JsonRpcId::Number(1),
        }
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    #[serde(default)]
    pub jsonrpc: String,

    /// Result on success. Lotus sends `null` for methods without a result.
    #[serde(default)]
    pub result: Option<serde_json::Value>,

    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// Identifier of the request this answers.
    #[serde(default)]
    pub id: JsonRpcId,
}

impl JsonRpcResponse {
    /// Extracts the typed result.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Rpc`] if the response carries an error object
    /// - [`GatewayError::Decode`] if the result does not match `T`
    pub fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T, GatewayError> {
        if let Some(error) = self.error {
            return Err(GatewayError::rpc(method, error.code, error.message));
        }
        let value = self.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|e| GatewayError::decode(method, e.to_string()))
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,

    /// Short description.
    pub message: String,

    /// Additional detail, if the node sent any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new("MpoolGetNonce", json!(["f01234"]));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "Filecoin.MpoolGetNonce",
                "params": ["f01234"],
                "id": 1
            })
        );
    }

    #[test]
    fn test_response_success() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":42,"id":1}"#).unwrap();
        assert_eq!(response.into_result::<u64>("MpoolGetNonce").unwrap(), 42);
    }

    #[test]
    fn test_response_error_object() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":1,"message":"actor not found"},"id":1}"#,
        )
        .unwrap();
        let err = response.into_result::<u64>("StateLookupID").unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rpc { ref method, code: 1, ref message }
                if method == "StateLookupID" && message == "actor not found"
        ));
    }

    #[test]
    fn test_response_wrong_type_is_decode_error() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":"nope","id":1}"#).unwrap();
        assert!(matches!(
            response.into_result::<u64>("MpoolGetNonce"),
            Err(GatewayError::Decode { .. })
        ));
    }

    #[test]
    fn test_null_result_for_unit() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":null,"id":1}"#).unwrap();
        response.into_result::<()>("WalletDelete").unwrap();
    }

    #[test]
    fn test_id_forms() {
        assert_eq!(serde_json::to_string(&JsonRpcId::Number(7)).unwrap(), "7");
        assert_eq!(
            serde_json::from_str::<JsonRpcId>(r#""abc""#).unwrap(),
            JsonRpcId::String("abc".to_string())
        );
        assert_eq!(
            serde_json::from_str::<JsonRpcId>("null").unwrap(),
            JsonRpcId::Null
        );
    }
}
