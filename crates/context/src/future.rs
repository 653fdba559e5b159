// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use quanta::Instant;
use tokio::task::futures::TaskLocalFuture;

use crate::LogContext;

/// A future running within a [`LogContext`]
pub type LogContextFuture<F> = TaskLocalFuture<LogContext, PollRecordingFuture<F>>;

impl LogContext {
    /// Wrap a future with the given log context
    pub(crate) fn wrap_future<F: Future>(&self, future: F) -> LogContextFuture<F> {
        crate::CURRENT_LOG_CONTEXT.scope(self.clone(), PollRecordingFuture { inner: future })
    }
}

pin_project_lite::pin_project! {
    /// A future which records the time spent polling it and the number of
    /// polls in the active log context
    pub struct PollRecordingFuture<F> {
        #[pin]
        inner: F,
    }
}

impl<F: Future> Future for PollRecordingFuture<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let start = Instant::now();
        let result = self.project().inner.poll(cx);

        let elapsed = start.elapsed();
        // Outside of a scope there is nothing to record into
        let _ = crate::CURRENT_LOG_CONTEXT.try_with(|c| c.record(1, elapsed));

        result
    }
}
