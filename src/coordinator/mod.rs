pub mod configuration;
pub mod greet;
pub mod search;
pub mod settings;

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

pub use configuration::{ConfigurationCoordinator, ConfigurationState};
pub use greet::{GreetCoordinator, GreetState};
pub use search::{QueryCoordinator, SearchState};
pub use settings::{SettingsCoordinator, SettingsState};

/// Request tags. Only the response carrying the latest tag may commit.
#[derive(Default)]
pub(crate) struct Generation(AtomicU64);

impl Generation {
    pub(crate) fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, tag: u64) -> bool {
        self.0.load(Ordering::SeqCst) == tag
    }

    /// Makes every in-flight request stale.
    pub(crate) fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Clears a busy marker when the operation ends, however it ends.
///
/// Skipped once a newer request owns the state.
pub(crate) struct BusyGuard<'a, S> {
    state: &'a watch::Sender<S>,
    generation: &'a Generation,
    tag: u64,
    release: fn(&mut S) -> bool,
}

impl<'a, S> BusyGuard<'a, S> {
    pub(crate) fn new(
        state: &'a watch::Sender<S>,
        generation: &'a Generation,
        tag: u64,
        release: fn(&mut S) -> bool,
    ) -> Self {
        Self {
            state,
            generation,
            tag,
            release,
        }
    }
}

impl<S> Drop for BusyGuard<'_, S> {
    fn drop(&mut self) {
        if self.generation.is_current(self.tag) {
            self.state.send_if_modified(self.release);
        }
    }
}

pub(crate) fn display_error(err: &anyhow::Error, fallback: &str) -> String {
    let msg = format!("{:#}", err);
    if msg.trim().is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_latest_wins() {
        let generation = Generation::default();
        let first = generation.begin();
        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        generation.invalidate();
        assert!(!generation.is_current(second));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let (tx, rx) = watch::channel(true);
        let generation = Generation::default();
        let tag = generation.begin();
        {
            let _busy = BusyGuard::new(&tx, &generation, tag, |b| std::mem::replace(b, false));
        }
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_guard_skips_when_superseded() {
        let (tx, rx) = watch::channel(true);
        let generation = Generation::default();
        let tag = generation.begin();
        {
            let _busy = BusyGuard::new(&tx, &generation, tag, |b| std::mem::replace(b, false));
            generation.begin();
        }
        assert!(*rx.borrow());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let (tx, rx) = watch::channel(true);
        let generation = Generation::default();
        let tag = generation.begin();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _busy = BusyGuard::new(&tx, &generation, tag, |b| std::mem::replace(b, false));
            panic!("store exploded");
        }));
        assert!(outcome.is_err());
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_display_error_fallback() {
        assert_eq!(display_error(&anyhow::anyhow!(""), "search failed"), "search failed");
        assert_eq!(display_error(&anyhow::anyhow!("boom"), "search failed"), "boom");
    }
}
