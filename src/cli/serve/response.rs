//! HTTP response writers.

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::rpc::RpcResponse;

/// Write a facade response.
pub fn respond(request: Request, reply: RpcResponse) -> Result<()> {
    let response = Response::from_string(reply.body)
        .with_status_code(StatusCode(reply.status))
        .with_header(make_header("Content-Type", reply.content_type)?);
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    respond(request, RpcResponse::text(503, "503 Service Unavailable"))
}

/// Respond with 400 when the body is not readable UTF-8.
pub fn respond_bad_body(request: Request) -> Result<()> {
    respond(request, RpcResponse::text(400, "request body must be UTF-8 JSON"))
}

fn make_header(key: &'static str, value: &'static str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|_| anyhow::anyhow!("invalid header {key}: {value}"))
}
