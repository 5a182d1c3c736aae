use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{Backend, SearchRequest};
use crate::state::{ConnectionConfig, NamedConfigEntry, SearchResult};

pub type Outcome<T> = std::result::Result<T, String>;

enum Reply<T> {
    Ready(Outcome<T>),
    Gated(oneshot::Receiver<Outcome<T>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T> {
        let outcome = match self {
            Reply::Ready(outcome) => outcome,
            Reply::Gated(rx) => rx.await.map_err(|_| anyhow!("gate dropped"))?,
        };
        outcome.map_err(|msg| anyhow!(msg))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Greet(String),
    Search(SearchRequest),
    TestConnection(ConnectionConfig),
    GetConfigurations(ConnectionConfig),
    UpdateConfiguration { key: String, value: String },
    OpenDirectory(String),
}

struct Queue<T>(Mutex<VecDeque<Reply<T>>>);

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self(Mutex::new(VecDeque::new()))
    }
}

impl<T> Queue<T> {
    fn push(&self, reply: Reply<T>) {
        self.0.lock().unwrap().push_back(reply);
    }

    fn pop(&self) -> Option<Reply<T>> {
        self.0.lock().unwrap().pop_front()
    }
}

/// Scripted replies queued per operation. A gated reply parks the call
/// until the test sends its outcome.
#[derive(Default)]
pub struct MockBackend {
    greet: Queue<String>,
    search: Queue<Vec<SearchResult>>,
    probe: Queue<bool>,
    configurations: Queue<Vec<NamedConfigEntry>>,
    update: Queue<()>,
    open: Queue<()>,
    calls: Mutex<Vec<Call>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_greet(&self, outcome: Outcome<String>) {
        self.greet.push(Reply::Ready(outcome));
    }

    pub fn reply_search(&self, outcome: Outcome<Vec<SearchResult>>) {
        self.search.push(Reply::Ready(outcome));
    }

    pub fn gate_search(&self) -> oneshot::Sender<Outcome<Vec<SearchResult>>> {
        let (tx, rx) = oneshot::channel();
        self.search.push(Reply::Gated(rx));
        tx
    }

    pub fn reply_probe(&self, outcome: Outcome<bool>) {
        self.probe.push(Reply::Ready(outcome));
    }

    pub fn gate_probe(&self) -> oneshot::Sender<Outcome<bool>> {
        let (tx, rx) = oneshot::channel();
        self.probe.push(Reply::Gated(rx));
        tx
    }

    pub fn reply_configurations(&self, outcome: Outcome<Vec<NamedConfigEntry>>) {
        self.configurations.push(Reply::Ready(outcome));
    }

    pub fn gate_configurations(&self) -> oneshot::Sender<Outcome<Vec<NamedConfigEntry>>> {
        let (tx, rx) = oneshot::channel();
        self.configurations.push(Reply::Gated(rx));
        tx
    }

    pub fn reply_update(&self, outcome: Outcome<()>) {
        self.update.push(Reply::Ready(outcome));
    }

    pub fn gate_update(&self) -> oneshot::Sender<Outcome<()>> {
        let (tx, rx) = oneshot::channel();
        self.update.push(Reply::Gated(rx));
        tx
    }

    pub fn reply_open(&self, outcome: Outcome<()>) {
        self.open.push(Reply::Ready(outcome));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Yields until `count` calls have reached the backend.
    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..10_000 {
            if self.calls.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("expected {} backend calls, got {:?}", count, self.calls());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn greet(&self, name: &str) -> Result<String> {
        self.record(Call::Greet(name.to_string()));
        match self.greet.pop() {
            Some(reply) => reply.resolve().await,
            None => Ok(format!("Hello, {}!", name)),
        }
    }

    async fn search_files(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        self.record(Call::Search(request.clone()));
        match self.search.pop() {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn test_connection(&self, db_config: &ConnectionConfig) -> Result<bool> {
        self.record(Call::TestConnection(db_config.clone()));
        match self.probe.pop() {
            Some(reply) => reply.resolve().await,
            None => Ok(true),
        }
    }

    async fn get_configurations(&self, db_config: &ConnectionConfig) -> Result<Vec<NamedConfigEntry>> {
        self.record(Call::GetConfigurations(db_config.clone()));
        match self.configurations.pop() {
            Some(reply) => reply.resolve().await,
            None => Ok(Vec::new()),
        }
    }

    async fn update_configuration(
        &self,
        _db_config: &ConnectionConfig,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.record(Call::UpdateConfiguration {
            key: key.to_string(),
            value: value.to_string(),
        });
        match self.update.pop() {
            Some(reply) => reply.resolve().await,
            None => Ok(()),
        }
    }

    async fn open_directory(&self, directory_path: &str) -> Result<()> {
        self.record(Call::OpenDirectory(directory_path.to_string()));
        match self.open.pop() {
            Some(reply) => reply.resolve().await,
            None => Ok(()),
        }
    }
}

pub fn result(filename: &str, directory: &str) -> SearchResult {
    SearchResult {
        filename: filename.to_string(),
        directory: directory.to_string(),
        last_modified: None,
    }
}

pub fn entry(id: i32, key: &str, value: &str, description: Option<&str>) -> NamedConfigEntry {
    NamedConfigEntry {
        id,
        key: key.to_string(),
        value: value.to_string(),
        description: description.map(str::to_string),
        updated_at: "2024-03-01 12:00:00".to_string(),
    }
}
