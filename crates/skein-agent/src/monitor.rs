use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use sysinfo::System;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use skein_core::error::{Result, SkeinError};

/// An operation entered into [`race`]. It receives a token that fires once
/// another operation has won.
pub type RaceOp<T> = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<T>> + Send>;

/// Box an async closure as a [`RaceOp`].
pub fn race_op<T, F, Fut>(f: F) -> RaceOp<T>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Box::new(move |token| Box::pin(f(token)))
}

/// Run `operations` concurrently and return the first one to finish.
///
/// Once a winner is in, every other operation's token is cancelled and they
/// get `grace` to wind down before being aborted. The winner's own error is
/// returned as is; a panicked winner becomes `SkeinError::Task`.
pub async fn race<T: Send + 'static>(operations: Vec<RaceOp<T>>, grace: Duration) -> Result<T> {
    if operations.is_empty() {
        return Err(SkeinError::Task("nothing to race".into()));
    }

    let parent = CancellationToken::new();
    let mut set = JoinSet::new();
    for op in operations {
        set.spawn(op(parent.child_token()));
    }

    let first = match set.join_next().await {
        Some(joined) => joined,
        None => return Err(SkeinError::Task("nothing to race".into())),
    };
    parent.cancel();

    let losers = set.len();
    if losers > 0 {
        let drained = tokio::time::timeout(grace, async {
            while set.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = set.len(),
                grace_ms = grace.as_millis() as u64,
                "Cancelled tasks did not stop in time, aborting"
            );
            set.abort_all();
            while set.join_next().await.is_some() {}
        }
        debug!(losers, "Race finished");
    }

    first.map_err(|e| SkeinError::Task(e.to_string()))?
}

/// One CPU and memory reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    /// Global CPU usage across all cores, 0-100.
    pub cpu_percent: f32,
    /// Used share of physical memory, 0-100.
    pub ram_percent: f32,
}

impl ResourceSample {
    pub fn status_line(&self) -> String {
        format!("cpu {:5.1}% | ram {:5.1}%", self.cpu_percent, self.ram_percent)
    }
}

/// Samples system CPU and RAM usage at a fixed interval.
pub struct ResourceMonitor {
    interval: Duration,
    sys: System,
}

impl ResourceMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sys: System::new(),
        }
    }

    /// Take one sample. CPU usage is relative to the previous refresh, so
    /// the very first reading may be zero.
    pub fn sample(&mut self) -> ResourceSample {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let ram_percent = if total > 0 {
            (self.sys.used_memory() as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        };

        ResourceSample {
            cpu_percent: self.sys.global_cpu_usage(),
            ram_percent,
        }
    }

    /// Report a sample to `on_sample` every interval until `cancel` fires.
    /// Returns the number of samples taken.
    pub async fn run<F>(mut self, cancel: CancellationToken, mut on_sample: F) -> usize
    where
        F: FnMut(ResourceSample) + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        let mut samples = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    on_sample(self.sample());
                    samples += 1;
                }
            }
        }
        debug!(samples, "Resource monitor stopped");
        samples
    }
}
