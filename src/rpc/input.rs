//! Procedure inputs.
//!
//! Inputs arrive as JSON: the `input` query parameter for queries, the body
//! for mutations. A missing input means "all defaults".

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RpcError;
use crate::core::{CounterName, DEFAULT_COUNTER};

/// Input of every `counter.*` procedure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CounterInput {
    #[serde(default = "default_session")]
    counter_session: String,
}

fn default_session() -> String {
    DEFAULT_COUNTER.to_string()
}

/// Input of `hello`.
#[derive(Debug, Default, Deserialize)]
struct HelloInput {
    #[serde(default)]
    name: Option<String>,
}

/// Parse raw input text; blank means absent.
pub fn parse_raw(raw: Option<&str>) -> Result<Option<Value>, RpcError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| RpcError::Parse(e.to_string())),
    }
}

/// Counter addressed by a `counter.*` input.
pub fn counter_name(input: Option<&Value>) -> Result<CounterName, RpcError> {
    let input: CounterInput = decode(input)?.unwrap_or_else(|| CounterInput {
        counter_session: default_session(),
    });
    Ok(CounterName::new(input.counter_session))
}

/// Name greeted by `hello`.
pub fn hello_name(input: Option<&Value>) -> Result<Option<String>, RpcError> {
    Ok(decode::<HelloInput>(input)?.unwrap_or_default().name)
}

fn decode<T: DeserializeOwned>(input: Option<&Value>) -> Result<Option<T>, RpcError> {
    input
        .map(|value| {
            T::deserialize(value).map_err(|e| RpcError::Validation(e.to_string()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_counter_name_defaults_to_global() {
        assert_eq!(counter_name(None).unwrap().as_str(), "global");
        assert_eq!(counter_name(Some(&json!({}))).unwrap().as_str(), "global");
    }

    #[test]
    fn test_counter_name_from_session() {
        let input = json!({ "counterSession": "room-1", "extra": true });
        assert_eq!(counter_name(Some(&input)).unwrap().as_str(), "room-1");
    }

    #[test]
    fn test_counter_name_wrong_type_is_rejected() {
        for bad in [json!({ "counterSession": 5 }), json!({ "counterSession": null }), json!(3)] {
            assert!(matches!(counter_name(Some(&bad)), Err(RpcError::Validation(_))));
        }
    }

    #[test]
    fn test_parse_raw() {
        assert_eq!(parse_raw(None).unwrap(), None);
        assert_eq!(parse_raw(Some("  ")).unwrap(), None);
        assert_eq!(parse_raw(Some("{}")).unwrap(), Some(json!({})));
        assert!(matches!(parse_raw(Some("{oops")), Err(RpcError::Parse(_))));
    }

    #[test]
    fn test_hello_name() {
        assert_eq!(hello_name(None).unwrap(), None);
        assert_eq!(hello_name(Some(&json!({ "name": "tRPC" }))).unwrap().as_deref(), Some("tRPC"));
        assert!(hello_name(Some(&json!({ "name": 1 }))).is_err());
    }
}
