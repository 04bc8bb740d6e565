//! Result codec: the JSON boundary of the gateway.
//!
//! Rows become ordered objects keyed by column name, call parameters are
//! decoded into backend values, and faults become error envelopes. No other
//! module builds an `ErrorEnvelope`.

use crate::core::db::{QueryResult, Value};
use crate::core::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;

/// Externally visible fault category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    /// Raised by the backend or its driver
    Database,
    /// Raised anywhere else
    Internal,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Database => "database",
            FaultKind::Internal => "internal",
        }
    }
}

/// Structured failure returned to callers in place of a raised fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: FaultKind,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn to_json(&self) -> String {
        serde_json::json!({ "kind": self.kind.as_str(), "message": &self.message }).to_string()
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

pub struct ResultCodec;

impl ResultCodec {
    /// Converts one backend value to JSON. Non-finite reals become `null`
    /// and blobs become arrays of byte values.
    pub fn value_to_json(value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::Integer(i) => JsonValue::Number((*i).into()),
            Value::Real(f) => Number::from_f64(*f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
            Value::Text(t) => JsonValue::String(t.clone()),
            Value::Blob(b) => JsonValue::Array(b.iter().map(|byte| JsonValue::from(*byte)).collect()),
        }
    }

    /// Pairs each row with the column names, keeping result-set order.
    ///
    /// A repeated column name keeps its first position and its last value.
    pub fn row_maps(result: &QueryResult) -> Vec<Map<String, JsonValue>> {
        result
            .rows
            .iter()
            .map(|row| {
                result
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), Self::value_to_json(value)))
                    .collect()
            })
            .collect()
    }

    /// Serializes a query result as a JSON array of row objects.
    pub fn encode(result: &QueryResult) -> Result<String> {
        Self::encode_json(&Self::row_maps(result))
    }

    pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    /// Decodes positional call parameters into backend values.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Validation` for objects, for arrays that are
    /// not byte sequences and for integers above `i64::MAX`.
    pub fn decode_params(params: &[JsonValue]) -> Result<Vec<Value>> {
        params
            .iter()
            .enumerate()
            .map(|(position, param)| Self::decode_param(param).map_err(|reason| {
                GatewayError::Validation(format!("parameter {}: {}", position + 1, reason))
            }))
            .collect()
    }

    fn decode_param(param: &JsonValue) -> std::result::Result<Value, String> {
        match param {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Integer(i64::from(*b))),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None if n.is_u64() => Err(format!("integer {} does not fit in 64 signed bits", n)),
                None => n
                    .as_f64()
                    .map(Value::Real)
                    .ok_or_else(|| format!("unsupported number {}", n)),
            },
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|byte| u8::try_from(byte).ok())
                        .ok_or_else(|| "arrays must contain byte values (0-255)".to_string())
                })
                .collect::<std::result::Result<Vec<u8>, String>>()
                .map(Value::Blob),
            JsonValue::Object(_) => Err("objects are not supported".to_string()),
        }
    }

    /// Translates a fault into the externally visible envelope.
    pub fn encode_error(fault: &GatewayError) -> ErrorEnvelope {
        let kind = if fault.is_driver_fault() {
            FaultKind::Database
        } else {
            FaultKind::Internal
        };
        ErrorEnvelope {
            kind,
            message: fault.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::DriverError;
    use insta::assert_snapshot;
    use serde_json::json;

    fn client_rows() -> QueryResult {
        QueryResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::Integer(1), Value::from("Alice")],
                vec![Value::Integer(2), Value::from("Bob")],
            ],
        )
    }

    #[test]
    fn test_encode_rows() {
        assert_snapshot!(ResultCodec::encode(&client_rows()).unwrap(), @r#"[{"id":1,"name":"Alice"},{"id":2,"name":"Bob"}]"#);
    }

    #[test]
    fn test_encode_keeps_column_order() {
        let result = QueryResult::new(
            vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()],
            vec![vec![Value::Real(0.5), Value::Null, Value::Blob(vec![0, 255])]],
        );
        let maps = ResultCodec::row_maps(&result);
        let keys: Vec<&str> = maps[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_snapshot!(ResultCodec::encode(&result).unwrap(), @r#"[{"zeta":0.5,"alpha":null,"mid":[0,255]}]"#);
    }

    #[test]
    fn test_duplicate_columns_keep_first_position_last_value() {
        let result = QueryResult::new(
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
            vec![vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]],
        );
        assert_eq!(ResultCodec::encode(&result).unwrap(), r#"[{"a":3,"b":2}]"#);
    }

    #[test]
    fn test_empty_result_encodes_empty_array() {
        let result = QueryResult::new(vec!["id".to_string()], vec![]);
        assert_eq!(ResultCodec::encode(&result).unwrap(), "[]");
    }

    #[test]
    fn test_non_finite_real_becomes_null() {
        assert_eq!(ResultCodec::value_to_json(&Value::Real(f64::NAN)), JsonValue::Null);
    }

    #[test]
    fn test_decode_params() {
        let params = ResultCodec::decode_params(&[
            json!(null),
            json!(true),
            json!(42),
            json!(2.5),
            json!("Carol"),
            json!([1, 2, 3]),
        ])
        .unwrap();
        assert_eq!(
            params,
            vec![
                Value::Null,
                Value::Integer(1),
                Value::Integer(42),
                Value::Real(2.5),
                Value::from("Carol"),
                Value::Blob(vec![1, 2, 3]),
            ]
        );
    }

    #[test]
    fn test_decode_rejects_objects_and_non_byte_arrays() {
        match ResultCodec::decode_params(&[json!(1), json!({"a": 1})]) {
            Err(GatewayError::Validation(msg)) => assert!(msg.starts_with("parameter 2")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
        assert!(ResultCodec::decode_params(&[json!([1, 300])]).is_err());
        assert!(ResultCodec::decode_params(&[json!(["x"])]).is_err());
    }

    #[test]
    fn test_decode_rejects_integers_beyond_i64() {
        assert_eq!(
            ResultCodec::decode_params(&[json!(i64::MAX), json!(i64::MIN)]).unwrap(),
            vec![Value::Integer(i64::MAX), Value::Integer(i64::MIN)]
        );
        match ResultCodec::decode_params(&[json!(u64::MAX)]) {
            Err(GatewayError::Validation(msg)) => {
                assert_eq!(msg, "parameter 1: integer 18446744073709551615 does not fit in 64 signed bits")
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_error_kinds() {
        let database = ResultCodec::encode_error(&GatewayError::Execution(DriverError::Backend(
            "no such table: Nope".to_string(),
        )));
        assert_eq!(database.kind, FaultKind::Database);
        assert_eq!(database.message, "Execution error: no such table: Nope");

        let internal = ResultCodec::encode_error(&GatewayError::Validation("Query must start with 'SELECT'".to_string()));
        assert_eq!(internal.kind, FaultKind::Internal);
        assert!(internal.message.contains("must start with"));
    }

    #[test]
    fn test_envelope_json() {
        let envelope = ResultCodec::encode_error(&GatewayError::UnknownOperation("drop_table".to_string()));
        assert_snapshot!(envelope.to_json(), @r#"{"kind":"internal","message":"Unknown operation: drop_table"}"#);

        let parsed: ErrorEnvelope = serde_json::from_str(&envelope.to_string()).unwrap();
        assert_eq!(parsed, envelope);
    }
}
