// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Per-task log contexts, tagging log lines with the request or connection
//! they belong to and recording how much time was spent on it.

mod fmt;
mod future;
mod layer;

use std::{
    borrow::Cow,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use quanta::Instant;
use tokio::task_local;

pub use self::{
    fmt::EventFormatter,
    future::{LogContextFuture, PollRecordingFuture},
    layer::{LogContextLayer, LogContextService},
};

/// A counter which increments each time we create a new log context
/// It will wrap around if we create more than [`u64::MAX`] contexts
static LOG_CONTEXT_INDEX: AtomicU64 = AtomicU64::new(0);
task_local! {
    static CURRENT_LOG_CONTEXT: LogContext;
}

/// A log context saves informations about the current task, such as the
/// elapsed time, the number of polls, and the poll time.
#[derive(Clone)]
pub struct LogContext {
    inner: Arc<LogContextInner>,
}

struct LogContextInner {
    /// A user-defined tag for the log context
    tag: Cow<'static, str>,

    /// A unique index for the log context
    index: u64,

    /// The time when the context was created
    start: Instant,

    /// The number of [`Future::poll`] recorded
    polls: AtomicU64,

    /// An approximation of the total CPU time spent in the context, in
    /// nanoseconds
    cpu_time: AtomicU64,
}

impl LogContext {
    /// Create a new log context with the given tag
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        let inner = LogContextInner {
            tag: tag.into(),
            index: LOG_CONTEXT_INDEX.fetch_add(1, Ordering::Relaxed),
            start: Instant::now(),
            polls: AtomicU64::new(0),
            cpu_time: AtomicU64::new(0),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// The log context of the current task, if any
    #[must_use]
    pub fn current() -> Option<Self> {
        Self::maybe_with(Clone::clone)
    }

    /// Run a closure with the current log context, if any
    pub fn maybe_with<F, R>(f: F) -> Option<R>
    where
        F: FnOnce(&Self) -> R,
    {
        CURRENT_LOG_CONTEXT.try_with(f).ok()
    }

    /// The tag this context was created with
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// Run the async function `f` with the given log context. It will wrap the
    /// output future to record poll and CPU statistics.
    pub fn run<F: FnOnce() -> Fut, Fut: Future>(&self, f: F) -> LogContextFuture<Fut> {
        let future = self.run_sync(f);
        self.wrap_future(future)
    }

    /// Run the sync function `f` with the given log context, recording the CPU
    /// time spent.
    pub fn run_sync<F: FnOnce() -> R, R>(&self, f: F) -> R {
        let start = Instant::now();
        let result = CURRENT_LOG_CONTEXT.sync_scope(self.clone(), f);
        self.record(1, start.elapsed());
        result
    }

    fn record(&self, polls: u64, elapsed: Duration) {
        let elapsed = elapsed.as_nanos().try_into().unwrap_or(u64::MAX);
        self.inner.polls.fetch_add(polls, Ordering::Relaxed);
        self.inner.cpu_time.fetch_add(elapsed, Ordering::Relaxed);
    }

    /// Create a snapshot of the log context statistics
    #[must_use]
    pub fn stats(&self) -> LogContextStats {
        LogContextStats {
            polls: self.inner.polls.load(Ordering::Relaxed),
            cpu_time: Duration::from_nanos(self.inner.cpu_time.load(Ordering::Relaxed)),
            elapsed: self.inner.start.elapsed(),
        }
    }
}

impl std::fmt::Display for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = &self.inner.tag;
        let index = self.inner.index;
        write!(f, "{tag}-{index}")
    }
}

/// A snapshot of a log context statistics
#[derive(Debug, Clone, Copy)]
pub struct LogContextStats {
    /// How many times the context was polled
    pub polls: u64,

    /// The approximate CPU time spent in the context
    pub cpu_time: Duration,

    /// How much time elapsed since the context was created
    pub elapsed: Duration,
}

impl std::fmt::Display for LogContextStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let polls = self.polls;
        #[expect(clippy::cast_precision_loss)]
        let cpu_time_ms = self.cpu_time.as_nanos() as f64 / 1_000_000.;
        #[expect(clippy::cast_precision_loss)]
        let elapsed_ms = self.elapsed.as_nanos() as f64 / 1_000_000.;
        write!(
            f,
            "polls: {polls}, cpu: {cpu_time_ms:.1}ms, elapsed: {elapsed_ms:.1}ms",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_context_outside_of_a_scope() {
        assert!(LogContext::current().is_none());
    }

    #[tokio::test]
    async fn context_is_available_in_the_future() {
        let context = LogContext::new("test");
        let tag = context
            .run(|| async { LogContext::current().map(|c| c.tag().to_owned()) })
            .await;
        assert_eq!(tag.as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn polls_are_recorded() {
        let context = LogContext::new("polls");
        context
            .run(|| async {
                tokio::task::yield_now().await;
            })
            .await;

        // One for the synchronous part, at least two for the yield
        assert!(context.stats().polls >= 3);
    }

    #[test]
    fn display_includes_the_index() {
        let first = LogContext::new("http-serve");
        let second = LogContext::new("http-serve");
        assert_ne!(first.to_string(), second.to_string());
        assert!(first.to_string().starts_with("http-serve-"));
    }
}
