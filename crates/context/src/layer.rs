// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    borrow::Cow,
    task::{Context, Poll},
};

use tower_layer::Layer;
use tower_service::Service;

use crate::{LogContext, LogContextFuture};

/// A function deriving the tag of a log context from a request
pub type Tagger<R> = fn(&R) -> Cow<'static, str>;

/// A layer which creates a log context for each request.
pub struct LogContextLayer<R> {
    tagger: Tagger<R>,
}

impl<R> Clone for LogContextLayer<R> {
    fn clone(&self) -> Self {
        Self {
            tagger: self.tagger,
        }
    }
}

impl<R> LogContextLayer<R> {
    /// Create a layer tagging each log context with the given function
    pub fn new(tagger: Tagger<R>) -> Self {
        Self { tagger }
    }
}

impl<S, R> Layer<S> for LogContextLayer<R>
where
    S: Service<R>,
{
    type Service = LogContextService<S, R>;

    fn layer(&self, inner: S) -> Self::Service {
        LogContextService {
            inner,
            tagger: self.tagger,
        }
    }
}

/// A service which runs each call of the inner service in a new
/// [`LogContext`]
pub struct LogContextService<S, R> {
    inner: S,
    tagger: Tagger<R>,
}

impl<S: Clone, R> Clone for LogContextService<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tagger: self.tagger,
        }
    }
}

impl<S, R> Service<R> for LogContextService<S, R>
where
    S: Service<R>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = LogContextFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let log_context = LogContext::new((self.tagger)(&req));
        log_context.run(|| self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use tower::{ServiceExt, service_fn};

    use super::*;

    #[tokio::test]
    async fn each_call_gets_a_tagged_context() {
        let layer = LogContextLayer::new(|req: &&'static str| Cow::Borrowed(*req));
        let service = layer.layer(service_fn(|_req: &'static str| async move {
            Ok::<_, Infallible>(LogContext::current().map(|c| c.tag().to_owned()))
        }));

        let tag = service.clone().oneshot("GET").await.unwrap();
        assert_eq!(tag.as_deref(), Some("GET"));

        let tag = service.oneshot("POST").await.unwrap();
        assert_eq!(tag.as_deref(), Some("POST"));
    }
}
