// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use anyhow::Context;
use athena_context::{LogContext, LogContextLayer};
use athena_handlers::AppState;
use axum::{Router, extract::Request};
use headers::{HeaderMapExt as _, UserAgent};
use hyper::{Method, Version};

fn http_method<B>(request: &hyper::Request<B>) -> &'static str {
    match *request.method() {
        Method::OPTIONS => "OPTIONS",
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::TRACE => "TRACE",
        Method::CONNECT => "CONNECT",
        Method::PATCH => "PATCH",
        _ => "_OTHER",
    }
}

fn http_version<B>(request: &hyper::Request<B>) -> &'static str {
    match request.version() {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "_OTHER",
    }
}

async fn log_response_middleware(
    request: Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let user_agent: Option<UserAgent> = request.headers().typed_get();
    let user_agent = user_agent.as_ref().map_or("-", |u| u.as_str());
    let method = http_method(&request);
    let path = request.uri().path().to_owned();
    let version = http_version(&request);

    let response = next.run(request).await;

    let Some(stats) = LogContext::maybe_with(LogContext::stats) else {
        tracing::error!("Missing log context for request, this is a bug!");
        return response;
    };

    let status_code = response.status();
    match status_code.as_u16() {
        100..=399 => tracing::info!(
            name: "http.server.response",
            "\"{method} {path} HTTP/{version}\" {status_code} {user_agent:?} [{stats}]",
        ),
        400..=499 => tracing::warn!(
            name: "http.server.response",
            "\"{method} {path} HTTP/{version}\" {status_code} {user_agent:?} [{stats}]",
        ),
        500..=599 => tracing::error!(
            name: "http.server.response",
            "\"{method} {path} HTTP/{version}\" {status_code} {user_agent:?} [{stats}]",
        ),
        _ => { /* This shouldn't happen */ }
    }

    response
}

/// The dev server router, with request logging
pub fn build_router(state: AppState) -> Router<()> {
    athena_handlers::router(state)
        .layer(axum::middleware::from_fn(log_response_middleware))
        .layer(LogContextLayer::new(|req: &Request| http_method(req).into()))
}

/// Bind the dev server listener.
///
/// The host is either an IP address or a name resolving to one or more
/// addresses, the first one which can be bound is used.
pub fn build_listener(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("could not resolve listener address {host}:{port}"))?
        .collect();

    let listener = TcpListener::bind(&addrs[..])
        .with_context(|| format!("could not bind address {host}:{port}"))?;

    Ok(listener)
}
