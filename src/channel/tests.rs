use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;

use super::*;
use crate::actor::{ActorLocator, ActorSettings, Broadcast, CounterHandle};
use crate::core::CounterName;
use crate::store::MemoryStore;

type Client = WebSocket<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    rt: Runtime,
    locator: ActorLocator,
    addr: SocketAddr,
}

impl Harness {
    fn new() -> Self {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let settings = ActorSettings {
            idle_timeout: None,
            ..ActorSettings::default()
        };
        let locator =
            ActorLocator::with_runtime(Arc::new(MemoryStore::new()), settings, rt.handle().clone());
        let addr = start_channel_server(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
            locator.clone(),
            rt.handle().clone(),
        )
        .unwrap();
        Self { rt, locator, addr }
    }

    fn counter(&self, name: &str) -> CounterHandle {
        self.locator.resolve(&CounterName::new(name)).unwrap()
    }

    fn increment(&self, name: &str) -> i64 {
        self.rt.block_on(self.counter(name).increment()).unwrap()
    }

    fn subscribers(&self, name: &str) -> usize {
        self.rt.block_on(self.counter(name).subscribers()).unwrap()
    }

    fn connect(&self, path: &str) -> Client {
        let (mut ws, _) = tungstenite::connect(format!("ws://{}{}", self.addr, path)).unwrap();
        if let MaybeTlsStream::Plain(stream) = ws.get_mut() {
            stream.set_read_timeout(Some(WAIT)).unwrap();
        }
        ws
    }

    fn subscribe(&self, path: &str) -> Client {
        let mut ws = self.connect(path);
        ws.send(Message::Text(SUBSCRIBE.into())).unwrap();
        ws
    }
}

fn next_count(ws: &mut Client) -> i64 {
    loop {
        match ws.read().unwrap() {
            Message::Text(text) => return Broadcast::from_json(text.as_str()).unwrap().count,
            _ => continue,
        }
    }
}

fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn test_subscribe_then_receive_updates() {
    let h = Harness::new();
    h.increment("ws");

    let mut ws = h.subscribe("/counters/ws/watch");
    assert_eq!(next_count(&mut ws), 1);

    h.increment("ws");
    h.increment("ws");
    assert_eq!(next_count(&mut ws), 2);
    assert_eq!(next_count(&mut ws), 3);
}

#[test]
fn test_two_subscribers_see_same_sequence() {
    let h = Harness::new();
    let path = "/trpc/counter.watch?input=%7B%22counterSession%22%3A%22pair%22%7D";
    let mut a = h.subscribe(path);
    let mut b = h.subscribe(path);
    assert_eq!(next_count(&mut a), 0);
    assert_eq!(next_count(&mut b), 0);

    for _ in 0..3 {
        h.increment("pair");
    }

    for ws in [&mut a, &mut b] {
        let seen: Vec<i64> = (0..3).map(|_| next_count(ws)).collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}

#[test]
fn test_nothing_sent_before_subscribe() {
    let h = Harness::new();
    let mut ws = h.connect("/counters/quiet/watch");
    if let MaybeTlsStream::Plain(stream) = ws.get_mut() {
        stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    }
    h.increment("quiet");
    assert!(ws.read().is_err());
    assert_eq!(h.subscribers("quiet"), 0);
}

#[test]
fn test_repeated_subscribe_is_ignored() {
    let h = Harness::new();
    let mut ws = h.subscribe("/counters/twice/watch");
    ws.send(Message::Text(SUBSCRIBE.into())).unwrap();
    assert_eq!(next_count(&mut ws), 0);

    h.increment("twice");
    assert_eq!(next_count(&mut ws), 1);
    assert_eq!(h.subscribers("twice"), 1);
}

#[test]
fn test_disconnect_removes_subscriber() {
    let h = Harness::new();
    let mut gone = h.subscribe("/counters/leave/watch");
    let mut stays = h.subscribe("/counters/leave/watch");
    assert_eq!(next_count(&mut gone), 0);
    assert_eq!(next_count(&mut stays), 0);

    gone.close(None).unwrap();
    let _ = gone.flush();
    drop(gone);

    assert!(wait_for(|| h.subscribers("leave") == 1));
    assert_eq!(h.increment("leave"), 1);
    assert_eq!(next_count(&mut stays), 1);
}

#[test]
fn test_plain_request_gets_426() {
    let h = Harness::new();
    let mut stream = TcpStream::connect(h.addr).unwrap();
    stream.set_read_timeout(Some(WAIT)).unwrap();
    stream
        .write_all(b"GET /counters/a/watch HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    assert!(response.starts_with("HTTP/1.1 426"), "{response}");
}

#[test]
fn test_unknown_path_is_refused() {
    let h = Harness::new();
    let err = tungstenite::connect(format!("ws://{}/nope", h.addr)).unwrap_err();
    let tungstenite::Error::Http(response) = err else {
        panic!("expected http error, got {err}");
    };
    assert_eq!(response.status(), 404);
}
