//! Counter service: HTTP procedures plus WebSocket subscriptions.
//!
//! ```text
//! tiny_http ──rayon pool──> RpcContext::handle ──block_on──> actors (tokio)
//! ws_port listener ──thread per connection──> Subscription
//! ```

mod lifecycle;
mod response;

pub use lifecycle::reachable;

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Method, Request, Server};
use tokio::runtime::Handle;

use crate::{
    actor::{ActorLocator, ActorSettings},
    channel,
    config::{TallyConfig, cfg},
    debug, log,
    rpc::{self, RpcContext, RpcRequest},
};

/// Upper bound on a procedure input body
const MAX_BODY: u64 = 64 * 1024;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
}

/// Bind the HTTP server without starting the request loop
pub fn bind_server(config: &TallyConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    crate::core::register_server(Arc::clone(&server));
    log!("serve"; "http://{}", addr);

    Ok(BoundServer { server })
}

impl BoundServer {
    /// Run the request loop until shutdown (blocking).
    pub fn run(self, ctx: RpcContext, runtime: &Handle, workers: usize) -> Result<()> {
        run_request_loop(&self.server, ctx, runtime, workers)
    }
}

/// Run `tally serve` until Ctrl+C.
pub fn serve() -> Result<()> {
    let config = cfg();
    let runtime = lifecycle::build_runtime()?;

    let store = crate::store::open(&config.store).context("failed to open store")?;
    let locator = ActorLocator::with_runtime(
        store,
        ActorSettings::from_config(&config.actor),
        runtime.handle().clone(),
    );

    let ws_addr = channel::start_channel_server(
        config.serve.interface,
        config.serve.ws_port,
        locator.clone(),
        runtime.handle().clone(),
    )?;
    let ws_base = format!("ws://{}", lifecycle::reachable(ws_addr));
    log!("ws"; "{}", ws_base);

    let bound = bind_server(&config)?;
    let ctx = RpcContext::new(locator.clone(), config.app.name.clone(), ws_base);
    let result = bound.run(ctx, runtime.handle(), config.serve.workers);

    lifecycle::stop(runtime, &locator);
    result
}

fn run_request_loop(
    server: &Server,
    ctx: RpcContext,
    runtime: &Handle,
    workers: usize,
) -> Result<()> {
    // Handlers block on actor replies; keep them off the tokio workers
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("http-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let ctx = ctx.clone();
        let runtime = runtime.clone();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx, &runtime) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(mut request: Request, ctx: &RpcContext, runtime: &Handle) -> Result<()> {
    // Early exit if shutdown requested
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let method = match request.method() {
        Method::Get | Method::Head => rpc::Method::Get,
        Method::Post => rpc::Method::Post,
        _ => rpc::Method::Other,
    };

    let mut body = String::new();
    if method == rpc::Method::Post
        && request
            .as_reader()
            .take(MAX_BODY)
            .read_to_string(&mut body)
            .is_err()
    {
        return response::respond_bad_body(request);
    }

    let target = request.url().to_string();
    let reply = runtime.block_on(ctx.handle(RpcRequest {
        method,
        target: &target,
        body: &body,
    }));

    debug!("rpc"; "{} {} -> {}", request.method(), target, reply.status);
    response::respond(request, reply)
}
