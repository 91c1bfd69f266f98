#![allow(dead_code)]

use genesisapi::{Client, ClientConfig, Clock, HttpResponse, NoCache, Params, Transport};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const BASE: &str = "https://genesis.example.org/rest/2020";

#[derive(Debug, Clone)]
pub struct Call {
    /// `endpoint/method`
    pub path: String,
    pub params: Params,
    pub at: Duration,
}

type Handler = Box<dyn Fn(&str, &Params, usize) -> HttpResponse>;

/// Answers every request through `handler(path, params, nth call to that path)` and keeps a log.
pub struct FakeTransport {
    handler: Handler,
    calls: Rc<RefCell<Vec<Call>>>,
    clock: FakeClock,
}

impl FakeTransport {
    pub fn new(
        clock: &FakeClock,
        handler: impl Fn(&str, &Params, usize) -> HttpResponse + 'static,
    ) -> (Self, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let transport = Self {
            handler: Box::new(handler),
            calls: Rc::clone(&calls),
            clock: clock.clone(),
        };
        (transport, calls)
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> genesisapi::Result<HttpResponse> {
        let path = url
            .strip_prefix(BASE)
            .unwrap_or(url)
            .trim_start_matches('/')
            .to_string();
        let params: Params = params.iter().cloned().collect();
        let nth = self.calls.borrow().iter().filter(|c| c.path == path).count();
        self.calls.borrow_mut().push(Call {
            path: path.clone(),
            params: params.clone(),
            at: self.clock.elapsed(),
        });
        Ok((self.handler)(&path, &params, nth))
    }
}

/// A clock that only moves when slept on.
#[derive(Debug, Clone)]
pub struct FakeClock {
    start: Instant,
    offset: Rc<Cell<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }
}

pub fn config() -> ClientConfig {
    ClientConfig {
        url: BASE.to_string(),
        username: "tester".to_string(),
        password: "secret".to_string(),
        cache_dir: None,
    }
}

pub fn client(transport: FakeTransport, clock: &FakeClock) -> Client {
    Client::with_transport(config(), transport)
        .with_cache(NoCache)
        .with_clock(clock.clone())
        .with_progress(false)
}

pub fn status(code: i64, kind: &str, content: &str) -> HttpResponse {
    HttpResponse::ok(
        serde_json::json!({
            "Ident": {"Service": "data", "Method": "tablefile"},
            "Status": {"Code": code, "Type": kind, "Content": content},
        })
        .to_string(),
    )
}

pub fn job_list(entries: &[(&str, &str)]) -> HttpResponse {
    let list: Vec<_> = entries
        .iter()
        .map(|(code, state)| {
            serde_json::json!({
                "Code": code,
                "State": state,
                "Date": "18.10.2026",
                "Time": "12:00:00",
            })
        })
        .collect();
    HttpResponse::ok(
        serde_json::json!({
            "Status": {"Code": 0, "Type": "Information", "Content": "Es wurden Objekte gefunden."},
            "List": list,
        })
        .to_string(),
    )
}

pub fn calls_to(calls: &Rc<RefCell<Vec<Call>>>, path: &str) -> Vec<Call> {
    calls
        .borrow()
        .iter()
        .filter(|c| c.path == path)
        .cloned()
        .collect()
}
