// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

//! Routes of the Athena dev server: aliased module loading, the
//! `/__athena` API and static files.

use std::sync::Arc;

use athena_alias::AliasResolver;
use athena_config::{AllowedHosts, PluginsConfig};
use axum::{Router, extract::FromRef, routing::get};
use camino::{Utf8Path, Utf8PathBuf};
use tower_http::services::{ServeDir, ServeFile};

mod health;
mod host_check;
mod module;
mod resolve;
mod status;
#[cfg(test)]
mod test_utils;

pub use self::host_check::host_check;

/// State shared by all the routes
#[derive(Clone)]
pub struct AppState {
    /// The alias chain used to resolve import specifiers
    pub resolver: Arc<AliasResolver>,

    /// Which `Host` header values are accepted
    pub allowed_hosts: Arc<AllowedHosts>,

    /// Directory served as static content
    pub root: Utf8PathBuf,

    /// The configured build plugins
    pub plugins: Arc<PluginsConfig>,

    /// Version reported by the status endpoint
    pub version: &'static str,
}

impl FromRef<AppState> for Arc<AliasResolver> {
    fn from_ref(input: &AppState) -> Self {
        input.resolver.clone()
    }
}

impl FromRef<AppState> for Arc<AllowedHosts> {
    fn from_ref(input: &AppState) -> Self {
        input.allowed_hosts.clone()
    }
}

impl FromRef<AppState> for Arc<PluginsConfig> {
    fn from_ref(input: &AppState) -> Self {
        input.plugins.clone()
    }
}

/// Routes of the `/__athena` API
pub fn api_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AppState: FromRef<S>,
    Arc<AliasResolver>: FromRef<S>,
{
    Router::new()
        .route("/__athena/health", get(self::health::get))
        .route("/__athena/status", get(self::status::get))
        .route("/__athena/resolve", get(self::resolve::get))
}

/// Route loading aliased modules by their specifier
pub fn module_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<AliasResolver>: FromRef<S>,
{
    Router::new().route("/@id/{*specifier}", get(self::module::get))
}

/// Serve files from the given directory, with its `index.html` as fallback
/// for paths which do not exist
#[must_use]
pub fn static_files(root: &Utf8Path) -> ServeDir<ServeFile> {
    ServeDir::new(root).fallback(ServeFile::new(root.join("index.html")))
}

/// The complete dev server router, behind the host check
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(api_router())
        .merge(module_router())
        .fallback_service(static_files(&state.root))
        .layer(axum::middleware::from_fn_with_state(
            state.allowed_hosts.clone(),
            host_check,
        ))
        .with_state(state)
}
