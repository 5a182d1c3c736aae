use std::sync::Arc;

use log::debug;
use tokio::sync::watch;

use super::{display_error, BusyGuard, Generation};
use crate::backend::{Backend, SearchRequest};
use crate::query::{self, Combinator, Query, Scope};
use crate::state::{ConnectionConfig, SearchResult};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchState {
    pub raw_input: String,
    pub results: Vec<SearchResult>,
    pub is_loading: bool,
    pub error: String,
    pub combinator: Combinator,
    pub scope: Scope,
}

impl SearchState {
    pub fn has_search_terms(&self) -> bool {
        query::has_search_terms(&self.raw_input)
    }

    pub fn search_terms(&self) -> Vec<String> {
        query::tokenize(&self.raw_input)
    }

    pub fn query(&self) -> Option<Query> {
        Query::parse(&self.raw_input, self.combinator, self.scope)
    }
}

/// Owns the search box: raw input, join/scope toggles and the result list.
pub struct QueryCoordinator {
    backend: Arc<dyn Backend>,
    state: watch::Sender<SearchState>,
    generation: Generation,
}

impl QueryCoordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: watch::Sender::new(SearchState::default()),
            generation: Generation::default(),
        }
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn set_raw_input(&self, raw: impl Into<String>) {
        let raw = raw.into();
        self.state.send_if_modified(|s| {
            if s.raw_input == raw {
                return false;
            }
            s.raw_input = raw;
            true
        });
    }

    pub fn set_combinator(&self, combinator: Combinator) {
        self.state.send_if_modified(|s| {
            std::mem::replace(&mut s.combinator, combinator) != combinator
        });
    }

    pub fn set_scope(&self, scope: Scope) {
        self.state
            .send_if_modified(|s| std::mem::replace(&mut s.scope, scope) != scope);
    }

    /// Runs the current query. Does nothing when the input holds no terms.
    ///
    /// A newer `search` or a `reset` supersedes this one: its response is
    /// then dropped instead of committed.
    pub async fn search(&self, db_config: &ConnectionConfig) {
        let query = self.state.borrow().query();
        let Some(query) = query else {
            return;
        };

        let tag = self.generation.begin();
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error.clear();
            s.results.clear();
        });
        let _loading = BusyGuard::new(&self.state, &self.generation, tag, |s| {
            std::mem::replace(&mut s.is_loading, false)
        });

        let request = SearchRequest::new(&query, db_config);
        debug!(
            "search: terms={:?} and={} filenames={} generation={}",
            request.search_terms, request.use_and_logic, request.search_in_filenames, tag
        );
        let outcome = self.backend.search_files(&request).await;

        if !self.generation.is_current(tag) {
            debug!("search: dropping stale response for generation {}", tag);
            return;
        }

        self.state.send_modify(|s| {
            match outcome {
                Ok(results) => {
                    debug!("search: {} results", results.len());
                    s.results = results;
                }
                Err(e) => s.error = display_error(&e, "search failed"),
            }
            s.is_loading = false;
        });
    }

    /// Asks the service to reveal `directory`. A failure lands in `error`;
    /// the result list is kept.
    pub async fn open_directory(&self, directory: &str) {
        debug!("open_directory: {:?}", directory);
        if let Err(e) = self.backend.open_directory(directory).await {
            let msg = display_error(&e, "failed to open directory");
            self.state.send_modify(|s| s.error = msg);
        }
    }

    /// Opens the directory of the result at `index`. False when there is no
    /// such result.
    pub async fn open_result_directory(&self, index: usize) -> bool {
        let directory = self.state.borrow().results.get(index).map(|r| r.directory.clone());
        let Some(directory) = directory else {
            return false;
        };
        self.open_directory(&directory).await;
        true
    }

    pub fn reset(&self) {
        self.generation.invalidate();
        self.state.send_modify(|s| {
            s.raw_input.clear();
            s.results.clear();
            s.error.clear();
            s.is_loading = false;
        });
    }
}
