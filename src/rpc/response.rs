//! Transport-neutral responses.

use serde_json::{Value, json};

use super::RpcError;

pub const JSON: &str = "application/json";
pub const PLAIN: &str = "text/plain; charset=utf-8";

/// Status, content type and body, ready to be written by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl RpcResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: JSON,
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: PLAIN,
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::text(status, "")
    }

    #[cfg(test)]
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Outcome of one procedure call, before envelope selection.
pub type CallResult = Result<Value, RpcError>;

/// `{"result":{"data":...}}` or the tRPC error envelope.
pub fn envelope(path: &str, result: &CallResult) -> (u16, Value) {
    match result {
        Ok(data) => (200, json!({ "result": { "data": data } })),
        Err(err) => {
            let status = err.status();
            let (code, number) = err.code();
            (
                status,
                json!({
                    "error": {
                        "message": err.to_string(),
                        "code": number,
                        "data": {
                            "code": code,
                            "httpStatus": status,
                            "path": path,
                        }
                    }
                }),
            )
        }
    }
}

/// Single call: the envelope as-is.
pub fn single(path: &str, result: CallResult) -> RpcResponse {
    let (status, body) = envelope(path, &result);
    RpcResponse::json(status, &body)
}

/// Batched calls: an array of envelopes, 207 when statuses differ.
pub fn batch(results: Vec<(String, CallResult)>) -> RpcResponse {
    let mut statuses = Vec::with_capacity(results.len());
    let bodies: Vec<Value> = results
        .iter()
        .map(|(path, result)| {
            let (status, body) = envelope(path, result);
            statuses.push(status);
            body
        })
        .collect();

    let status = match statuses.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s == first) => *first,
        Some(_) => 207,
        None => 200,
    };
    RpcResponse::json(status, &Value::Array(bodies))
}
