//! Typed rule payloads
//!
//! Payloads arrive as free-form JSON (or TOML converted to JSON) on a
//! [`RuleConfig`]; each rule decodes the shape it needs. A missing or
//! undecodable payload is a configuration error.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::RuleConfig;
use crate::error::ReviewError;

/// `{ "number": N }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumberPayload {
    pub number: i64,
}

/// `{ "list": ["...", ...] }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StringArrayPayload {
    pub list: Vec<String>,
}

/// `{ "format": "...", "maxLength": N }`
///
/// A `maxLength` of 0 (or absent) means the default identifier limit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingPayload {
    pub format: String,
    #[serde(default)]
    pub max_length: usize,
}

/// `{ "required": bool, "maxLength": N }`
///
/// A non-positive `maxLength` disables the length check.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentConventionPayload {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_length: i64,
}

impl RuleConfig {
    /// Decode the payload into `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, ReviewError> {
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| ReviewError::MissingPayload {
                rule: self.rule_type.clone(),
            })?;
        serde_json::from_value(payload.clone()).map_err(|source| ReviewError::InvalidPayload {
            rule: self.rule_type.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleLevel, RuleType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_naming_payload_defaults_length() {
        let config = RuleConfig::new(RuleType::NamingTable, RuleLevel::Warning)
            .with_payload(json!({"format": "^[a-z]+$"}));
        let payload: NamingPayload = config.decode_payload().unwrap();
        assert_eq!(
            payload,
            NamingPayload {
                format: "^[a-z]+$".to_string(),
                max_length: 0,
            }
        );
    }

    #[test]
    fn test_missing_payload_is_an_error() {
        let config = RuleConfig::new(RuleType::TableLimitSize, RuleLevel::Warning);
        let err = config.decode_payload::<NumberPayload>().unwrap_err();
        assert!(matches!(err, ReviewError::MissingPayload { .. }));
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let config = RuleConfig::new(RuleType::TableLimitSize, RuleLevel::Warning)
            .with_payload(json!({"number": "lots"}));
        let err = config.decode_payload::<NumberPayload>().unwrap_err();
        assert!(matches!(err, ReviewError::InvalidPayload { .. }));
    }
}
