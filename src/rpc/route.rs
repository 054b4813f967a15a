//! Request target parsing.
//!
//! ```text
//! /trpc/<proc>[,<proc>...]?batch=1&input=<json>   Route::Trpc
//! /counters/<name>[/<action>]                      Route::Counter
//! /api/...                                         Route::Api
//! ```

use url::Url;

use crate::core::CounterName;

/// HTTP method as far as routing cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

/// Parsed request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Trpc {
        procedures: Vec<String>,
        batch: bool,
        /// Raw `input` query parameter, already percent-decoded
        input: Option<String>,
    },
    Counter {
        name: CounterName,
        action: CounterAction,
    },
    Api,
    NotFound,
}

/// Counter operation shared by procedures and direct routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    Get,
    Increment,
    Decrement,
    Reset,
}

impl CounterOp {
    /// Queries are read with GET, mutations with POST.
    pub fn method(self) -> Method {
        match self {
            Self::Get => Method::Get,
            _ => Method::Post,
        }
    }
}

/// What `/counters/<name>/...` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Op(CounterOp),
    Subscribers,
    Watch,
    Unknown,
}

impl Route {
    pub fn parse(target: &str) -> Self {
        let Ok(url) = Url::parse("http://localhost").and_then(|base| base.join(target)) else {
            return Self::NotFound;
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["trpc", procedures] if !procedures.is_empty() => {
                let mut batch = false;
                let mut input = None;
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "batch" => batch = value == "1" || value == "true",
                        "input" => input = Some(value.into_owned()),
                        _ => {}
                    }
                }
                Self::Trpc {
                    procedures: procedures.split(',').map(str::to_string).collect(),
                    batch,
                    input,
                }
            }
            ["counters", name, rest @ ..] if !name.is_empty() => Self::Counter {
                name: CounterName::from_segment(name),
                action: CounterAction::parse(rest),
            },
            ["api", ..] => Self::Api,
            _ => Self::NotFound,
        }
    }
}

impl CounterAction {
    fn parse(rest: &[&str]) -> Self {
        match rest {
            [] | [""] => Self::Op(CounterOp::Get),
            ["increment"] => Self::Op(CounterOp::Increment),
            ["decrement"] => Self::Op(CounterOp::Decrement),
            ["reset"] => Self::Op(CounterOp::Reset),
            ["subscribers"] => Self::Subscribers,
            ["watch"] => Self::Watch,
            _ => Self::Unknown,
        }
    }
}
