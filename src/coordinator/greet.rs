use std::sync::Arc;

use log::debug;
use tokio::sync::watch;

use super::{display_error, Generation};
use crate::backend::Backend;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GreetState {
    pub name: String,
    pub greeting: String,
    pub error: String,
}

impl GreetState {
    pub fn name_len(&self) -> usize {
        self.name.chars().count()
    }
}

pub struct GreetCoordinator {
    backend: Arc<dyn Backend>,
    state: watch::Sender<GreetState>,
    generation: Generation,
}

impl GreetCoordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: watch::Sender::new(GreetState::default()),
            generation: Generation::default(),
        }
    }

    pub fn snapshot(&self) -> GreetState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GreetState> {
        self.state.subscribe()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.state.send_modify(|s| s.name = name);
    }

    pub async fn submit(&self) {
        let tag = self.generation.begin();
        let name = self.state.borrow().name.clone();
        debug!("greet: name=\"{}\"", name);
        let outcome = self.backend.greet(&name).await;
        if !self.generation.is_current(tag) {
            return;
        }
        self.state.send_modify(|s| match outcome {
            Ok(greeting) => {
                s.greeting = greeting;
                s.error.clear();
            }
            Err(e) => s.error = display_error(&e, "greet failed"),
        });
    }

    pub fn reset(&self) {
        self.generation.invalidate();
        self.state.send_modify(|s| *s = GreetState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    #[tokio::test]
    async fn test_submit() {
        let backend = Arc::new(MockBackend::new());
        let coord = GreetCoordinator::new(backend);
        coord.set_name("Giulia");
        coord.submit().await;
        let state = coord.snapshot();
        assert_eq!(state.greeting, "Hello, Giulia!");
        assert_eq!(state.name_len(), 6);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_greeting() {
        let backend = Arc::new(MockBackend::new());
        backend.reply_greet(Ok("Hello, a!".into()));
        backend.reply_greet(Err("backend offline".into()));
        let coord = GreetCoordinator::new(backend);
        coord.set_name("a");
        coord.submit().await;
        coord.submit().await;
        let state = coord.snapshot();
        assert_eq!(state.greeting, "Hello, a!");
        assert_eq!(state.error, "backend offline");
    }

    #[tokio::test]
    async fn test_reset() {
        let backend = Arc::new(MockBackend::new());
        let coord = GreetCoordinator::new(backend);
        coord.set_name("Nicolò");
        coord.submit().await;
        coord.reset();
        assert_eq!(coord.snapshot(), GreetState::default());
    }

    #[test]
    fn test_name_len_counts_chars() {
        let state = GreetState {
            name: "Nicolò".into(),
            ..GreetState::default()
        };
        assert_eq!(state.name_len(), 6);
    }
}
