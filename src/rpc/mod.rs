//! RPC facade: typed procedures over the actor system.
//!
//! The facade is transport-neutral. The HTTP server hands it a method, a
//! request target and a body, and writes back the `RpcResponse` it returns.
//!
//! # Procedures
//!
//! | Path                 | Kind     | Result                          |
//! |----------------------|----------|---------------------------------|
//! | `hello`              | query    | `{"greeting": "Hello <name>!"}` |
//! | `getUser`            | query    | `{"name": <app>, "id": 1}`      |
//! | `counter.get`        | query    | `{"counter": n}`                |
//! | `counter.increment`  | mutation | `{"counter": n}`                |
//! | `counter.decrement`  | mutation | `{"counter": n}`                |
//! | `counter.reset`      | mutation | `{"counter": n}`                |
//! | `counter.watch`      | stream   | WebSocket listener only         |

mod error;
mod input;
mod response;
mod route;

pub use error::RpcError;
pub use input::{counter_name, parse_raw};
pub use response::RpcResponse;
pub use route::{CounterAction, CounterOp, Method, Route};

use serde_json::{Value, json};

use crate::actor::{ActorLocator, CounterError, CounterHandle};
use crate::core::CounterName;
use response::CallResult;

/// Everything a request needs besides itself.
#[derive(Clone)]
pub struct RpcContext {
    locator: ActorLocator,
    app_name: String,
    /// `ws://host:port` of the subscription listener
    ws_base: String,
}

/// One incoming request.
#[derive(Debug, Clone, Copy)]
pub struct RpcRequest<'a> {
    pub method: Method,
    pub target: &'a str,
    pub body: &'a str,
}

impl RpcContext {
    pub fn new(
        locator: ActorLocator,
        app_name: impl Into<String>,
        ws_base: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            app_name: app_name.into(),
            ws_base: ws_base.into(),
        }
    }

    fn watch_url(&self, name: &CounterName) -> String {
        use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
        let segment = utf8_percent_encode(name.as_str(), NON_ALPHANUMERIC);
        format!("{}/counters/{}/watch", self.ws_base, segment)
    }

    /// Route and execute one request.
    pub async fn handle(&self, request: RpcRequest<'_>) -> RpcResponse {
        match Route::parse(request.target) {
            Route::Trpc {
                procedures,
                batch,
                input,
            } => self.trpc(request, procedures, batch, input).await,
            Route::Counter { name, action } => {
                self.counter_route(request.method, name, action).await
            }
            Route::Api => RpcResponse::json(200, &json!({ "name": self.app_name })),
            Route::NotFound => RpcResponse::empty(404),
        }
    }

    // ========================================================================
    // tRPC
    // ========================================================================

    async fn trpc(
        &self,
        request: RpcRequest<'_>,
        procedures: Vec<String>,
        batch: bool,
        query_input: Option<String>,
    ) -> RpcResponse {
        // Queries carry input in the URL, mutations in the body
        let raw = match request.method {
            Method::Get => query_input.as_deref(),
            _ => Some(request.body),
        };
        let input = match parse_raw(raw) {
            Ok(input) => input,
            Err(RpcError::Parse(message)) if batch => {
                let results = procedures
                    .into_iter()
                    .map(|path| (path, Err(RpcError::Parse(message.clone()))))
                    .collect();
                return response::batch(results);
            }
            Err(err) => return response::single(&procedures.join(","), Err(err)),
        };

        if !batch {
            let path = procedures.join(",");
            let result = self.call(&path, request.method, input.as_ref()).await;
            return response::single(&path, result);
        }

        let mut results = Vec::with_capacity(procedures.len());
        for (index, path) in procedures.into_iter().enumerate() {
            let item = input.as_ref().and_then(|all| all.get(index.to_string()));
            let result = self.call(&path, request.method, item).await;
            results.push((path, result));
        }
        response::batch(results)
    }

    async fn call(&self, path: &str, method: Method, input: Option<&Value>) -> CallResult {
        match path {
            "hello" => {
                expect_method(path, method, Method::Get)?;
                let name = input::hello_name(input)?;
                Ok(json!({ "greeting": format!("Hello {}!", name.as_deref().unwrap_or("world")) }))
            }
            "getUser" => {
                expect_method(path, method, Method::Get)?;
                Ok(json!({ "name": self.app_name, "id": 1 }))
            }
            "counter.watch" => {
                let name = counter_name(input)?;
                Err(RpcError::UpgradeRequired(self.watch_url(&name)))
            }
            _ => {
                let op = counter_procedure(path)
                    .ok_or_else(|| RpcError::NotFound(path.to_string()))?;
                expect_method(path, method, op.method())?;
                let name = counter_name(input)?;
                let counter = self.apply(&name, op).await?;
                Ok(json!({ "counter": counter }))
            }
        }
    }

    // ========================================================================
    // direct counter routes
    // ========================================================================

    async fn counter_route(
        &self,
        method: Method,
        name: CounterName,
        action: CounterAction,
    ) -> RpcResponse {
        let result = match action {
            CounterAction::Op(op) if op.method() == method => {
                self.apply(&name, op).await.map(|count| json!({ "count": count }))
            }
            CounterAction::Subscribers if method == Method::Get => self
                .subscribers(&name)
                .await
                .map(|n| json!({ "subscribers": n })),
            CounterAction::Watch => {
                return error_json(&RpcError::UpgradeRequired(self.watch_url(&name)));
            }
            _ => return RpcResponse::text(404, "Not found"),
        };

        match result {
            Ok(body) => RpcResponse::json(200, &body),
            Err(err) => error_json(&RpcError::from(err)),
        }
    }

    fn resolve(&self, name: &CounterName) -> Result<CounterHandle, CounterError> {
        self.locator.resolve(name)
    }

    async fn subscribers(&self, name: &CounterName) -> Result<usize, CounterError> {
        self.resolve(name)?.subscribers().await
    }

    async fn apply(&self, name: &CounterName, op: CounterOp) -> Result<i64, CounterError> {
        let counter = self.resolve(name)?;
        let result = match op {
            CounterOp::Get => counter.value().await,
            CounterOp::Increment => counter.increment().await,
            CounterOp::Decrement => counter.decrement().await,
            CounterOp::Reset => counter.reset().await,
        };
        if let Err(err) = &result {
            crate::log!("rpc"; "{} {:?} failed: {}", name, op, err);
        }
        result
    }
}

fn counter_procedure(path: &str) -> Option<CounterOp> {
    match path {
        "counter.get" => Some(CounterOp::Get),
        "counter.increment" => Some(CounterOp::Increment),
        "counter.decrement" => Some(CounterOp::Decrement),
        "counter.reset" => Some(CounterOp::Reset),
        _ => None,
    }
}

fn expect_method(path: &str, actual: Method, expected: Method) -> Result<(), RpcError> {
    if actual == expected {
        return Ok(());
    }
    Err(RpcError::MethodNotAllowed {
        procedure: path.to_string(),
        expected: match expected {
            Method::Get => "GET",
            _ => "POST",
        },
    })
}

fn error_json(err: &RpcError) -> RpcResponse {
    RpcResponse::json(err.status(), &json!({ "error": err.to_string() }))
}
