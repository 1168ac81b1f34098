//! Boots every subsystem concurrently and waits for all of them to
//! finish initializing before declaring the launcher started.
//!
//! The original booleans-and-polling approach is replaced with a
//! counted barrier: each subsystem's `initialize()` holds it open until
//! its own setup completes, and the controller's `boot()` future
//! resolves the instant the last one does.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Barrier;

/// A subsystem the controller boots. Each one receives the shared
/// barrier and must call `.wait()` on it once its own setup completes.
#[async_trait]
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self, barrier: Arc<Barrier>);
}

/// Notified once every subsystem has finished initializing.
pub trait StartupSink: Send + Sync {
    fn notify_started(&self);
}

/// A sink that only logs; stands in for a UI that isn't wired up yet.
pub struct LoggingSink;

impl StartupSink for LoggingSink {
    fn notify_started(&self) {
        log::info!("all subsystems initialized");
    }
}

/// Drives concurrent subsystem initialization with a join barrier sized
/// to the subsystem count.
///
/// Each slot is an `Option` so a caller can reserve a position before
/// its subsystem is constructed; a `None` slot at boot time is a
/// programmer error.
pub struct Controller {
    subsystems: Vec<Option<Arc<dyn Subsystem>>>,
    sink: Arc<dyn StartupSink>,
}

impl Controller {
    pub fn new(subsystems: Vec<Option<Arc<dyn Subsystem>>>, sink: Arc<dyn StartupSink>) -> Controller {
        Controller { subsystems, sink }
    }

    /// Spawns every subsystem's `initialize()` concurrently, waits for
    /// all of them to cross the barrier, then notifies the sink.
    pub async fn boot(&self) {
        let count = self.subsystems.len();
        assert!(count > 0, "controller has no subsystems to boot");
        let barrier = Arc::new(Barrier::new(count));

        let mut handles = Vec::with_capacity(count);
        for (index, slot) in self.subsystems.iter().enumerate() {
            let Some(subsystem) = slot.clone() else {
                panic!("subsystem {index} is unset");
            };
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                log::debug!("subsystem {} ({}) initializing", index, subsystem.name());
                subsystem.initialize(barrier).await;
            }));
        }

        for (index, handle) in handles.into_iter().enumerate() {
            if let Err(err) = handle.await {
                panic!("subsystem {index} panicked during initialization: {err}");
            }
        }

        self.sink.notify_started();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSubsystem {
        name: &'static str,
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Subsystem for CountingSubsystem {
        fn name(&self) -> &str {
            self.name
        }

        async fn initialize(&self, barrier: Arc<Barrier>) {
            self.counter.fetch_add(1, Ordering::SeqCst);
            barrier.wait().await;
        }
    }

    struct FlagSink {
        started: Arc<AtomicUsize>,
    }

    impl StartupSink for FlagSink {
        fn notify_started(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn boot_initializes_every_subsystem_and_notifies_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(AtomicUsize::new(0));

        let subsystems: Vec<Option<Arc<dyn Subsystem>>> = vec![
            Some(Arc::new(CountingSubsystem { name: "store", counter: Arc::clone(&counter) })),
            Some(Arc::new(CountingSubsystem { name: "identity", counter: Arc::clone(&counter) })),
            Some(Arc::new(CountingSubsystem { name: "net", counter: Arc::clone(&counter) })),
        ];
        let sink = Arc::new(FlagSink { started: Arc::clone(&started) });

        let controller = Controller::new(subsystems, sink);
        controller.boot().await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "controller has no subsystems")]
    async fn boot_panics_with_no_subsystems() {
        let sink = Arc::new(FlagSink { started: Arc::new(AtomicUsize::new(0)) });
        let controller = Controller::new(Vec::new(), sink);
        controller.boot().await;
    }

    #[tokio::test]
    #[should_panic(expected = "subsystem 1 is unset")]
    async fn boot_panics_naming_the_unset_slot() {
        let counter = Arc::new(AtomicUsize::new(0));
        let subsystems: Vec<Option<Arc<dyn Subsystem>>> = vec![
            Some(Arc::new(CountingSubsystem { name: "store", counter: Arc::clone(&counter) })),
            None,
        ];
        let sink = Arc::new(FlagSink { started: Arc::new(AtomicUsize::new(0)) });
        let controller = Controller::new(subsystems, sink);
        controller.boot().await;
    }
}
