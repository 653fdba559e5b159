// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use athena_config::AllowedHosts;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use headers::HeaderMapExt;
use hyper::StatusCode;

/// The host name the request was sent to, from the `Host` header, or from
/// the request target for HTTP/2 requests
fn request_host(request: &Request) -> Option<String> {
    if let Some(host) = request.headers().typed_get::<headers::Host>() {
        return Some(host.hostname().to_owned());
    }

    request.uri().host().map(ToOwned::to_owned)
}

/// Middleware rejecting requests sent to a host which is not allowed
pub async fn host_check(
    State(allowed_hosts): State<Arc<AllowedHosts>>,
    request: Request,
    next: Next,
) -> Response {
    if allowed_hosts.is_any() {
        return next.run(request).await;
    }

    match request_host(&request) {
        Some(host) if allowed_hosts.allows(&host) => next.run(request).await,
        Some(host) => {
            tracing::warn!(%host, "Blocked request to a host which is not allowed");
            (
                StatusCode::FORBIDDEN,
                format!(
                    "Blocked request. This host ({host:?}) is not allowed.\n\
                     To allow this host, add {host:?} to server.allowed_hosts in the configuration.\n"
                ),
            )
                .into_response()
        }
        None => {
            tracing::warn!("Blocked request without a host");
            (
                StatusCode::FORBIDDEN,
                "Blocked request. The request has no Host header.\n",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use athena_config::AllowedHosts;
    use hyper::{Request, StatusCode};

    use crate::test_utils::{RequestBuilderExt, ResponseExt, TestState, setup};

    #[tokio::test]
    async fn any_host_is_allowed_by_default() {
        setup();
        let state = TestState::new();

        let request = Request::get("/__athena/health")
            .host("dashboard.example.com:3002")
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);

        // Even without a Host header
        let request = Request::get("/__athena/health").empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn foreign_hosts_are_blocked() {
        setup();
        let state = TestState::new().with_allowed_hosts(AllowedHosts::List(vec![
            ".athena.test".to_owned(),
        ]));

        let request = Request::get("/__athena/health")
            .host("preview.athena.test:3002")
            .empty();
        state.request(request).await.assert_status(StatusCode::OK);

        let request = Request::get("/__athena/health")
            .host("localhost:3002")
            .empty();
        state.request(request).await.assert_status(StatusCode::OK);

        let request = Request::get("/__athena/health")
            .host("192.168.1.20:3002")
            .empty();
        state.request(request).await.assert_status(StatusCode::OK);

        let request = Request::get("/__athena/health")
            .host("evil.example.com")
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.body().contains("\"evil.example.com\""));

        // The check also applies to static files
        let request = Request::get("/index.html").host("evil.example.com").empty();
        state.request(request).await.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_host_is_blocked_when_restricted() {
        setup();
        let state = TestState::new().with_allowed_hosts(AllowedHosts::Flag(false));

        let request = Request::get("/__athena/health").empty();
        state.request(request).await.assert_status(StatusCode::FORBIDDEN);

        // HTTP/2 style requests carry the host in the target
        let request = Request::get("http://localhost/__athena/health").empty();
        state.request(request).await.assert_status(StatusCode::OK);
    }
}
