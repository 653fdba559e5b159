// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Shutdown sequence of the dev server.
//!
//! The first SIGTERM or SIGINT starts a graceful shutdown: listeners stop
//! accepting and open connections get to finish. A second signal, or the
//! grace period running out, aborts whatever is left.

use std::{pin::pin, process::ExitCode, time::Duration};

use futures_util::{Stream, StreamExt, stream};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// How long open connections get to finish after the first signal
const GRACE_PERIOD: Duration = Duration::from_secs(60);

/// SIGTERM and SIGINT, as a stream of signal names
fn termination_signals() -> std::io::Result<impl Stream<Item = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let sigterm = stream::poll_fn(move |cx| sigterm.poll_recv(cx).map(|s| s.map(|()| "SIGTERM")));
    let sigint = stream::poll_fn(move |cx| sigint.poll_recv(cx).map(|s| s.map(|()| "SIGINT")));

    Ok(stream::select(sigterm, sigint))
}

/// Owns the shutdown tokens and the tasks which have to finish before the
/// process exits
pub struct Shutdown {
    graceful: CancellationToken,
    abort: CancellationToken,
    tasks: TaskTracker,
    grace_period: Duration,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        // Aborting implies the graceful shutdown was requested as well
        let abort = CancellationToken::new();
        let graceful = abort.child_token();

        Self {
            graceful,
            abort,
            tasks: TaskTracker::new(),
            grace_period: GRACE_PERIOD,
        }
    }

    /// Tasks spawned here are waited for before exiting
    #[must_use]
    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Cancelled when the server should stop accepting connections
    #[must_use]
    pub fn graceful_token(&self) -> CancellationToken {
        self.graceful.clone()
    }

    /// Cancelled when the remaining connections should be dropped
    #[must_use]
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Wait for a termination signal and shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers could not be installed
    pub async fn run(self) -> std::io::Result<ExitCode> {
        let signals = termination_signals()?;
        Ok(self.run_with(pin!(signals)).await)
    }

    async fn run_with<S>(self, mut signals: S) -> ExitCode
    where
        S: Stream<Item = &'static str> + Unpin,
    {
        let stopped_on_its_own = tokio::select! {
            () = self.graceful.cancelled() => {
                tracing::warn!("The server stopped on its own, shutting down");
                true
            }

            Some(signal) = signals.next() => {
                tracing::info!(signal, "Shutting down, waiting for open connections");
                false
            }
        };

        self.graceful.cancel();
        self.tasks.close();

        tokio::select! {
            () = self.tasks.wait() => {}

            Some(signal) = signals.next() => {
                tracing::warn!(signal, "Received a second signal, dropping open connections");
            }

            () = tokio::time::sleep(self.grace_period) => {
                tracing::warn!(
                    grace_period = ?self.grace_period,
                    "Connections did not finish in time, dropping them"
                );
            }
        }

        self.abort.cancel();
        self.tasks.wait().await;

        tracing::info!("All tasks are done, exiting");

        if stopped_on_its_own {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}
