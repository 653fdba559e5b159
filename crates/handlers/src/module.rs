// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use athena_alias::{AliasResolver, Resolution, ResolveError};
use axum::{
    Json,
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
};
use camino::Utf8Path;
use hyper::{
    StatusCode,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde::Serialize;
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::ServeFile;

#[derive(Debug, Error)]
pub(crate) enum RouteError {
    #[error("no alias rule matches {0:?}")]
    NoMatchingRule(String),

    #[error(transparent)]
    NotFound(#[from] ResolveError),

    #[error("{0:?} resolves outside of the aliased directory")]
    OutsideRoot(String),
}

#[derive(Serialize)]
struct ModuleNotFound<'a> {
    error: &'static str,
    specifier: &'a str,
    path: &'a Utf8Path,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            Self::NoMatchingRule(_) => {
                (StatusCode::NOT_FOUND, format!("{self}\n")).into_response()
            }

            Self::OutsideRoot(_) => {
                (StatusCode::FORBIDDEN, format!("{self}\n")).into_response()
            }

            Self::NotFound(ResolveError::ModuleNotFound { specifier, path }) => (
                StatusCode::NOT_FOUND,
                Json(ModuleNotFound {
                    error: "module_not_found",
                    specifier: &specifier,
                    path: &path,
                }),
            )
                .into_response(),
        }
    }
}

/// Sources are served as-is, so TypeScript modules get a script content type
/// instead of the one guessed from their extension
fn is_script(path: &Utf8Path) -> bool {
    matches!(
        path.extension(),
        Some("ts" | "mts" | "cts" | "tsx" | "js" | "mjs" | "cjs" | "jsx")
    )
}

/// Check that `path` is inside `root` once symlinks and `..` segments are
/// resolved. Both have to exist.
fn is_within(root: &Utf8Path, path: &Utf8Path) -> bool {
    match (root.canonicalize_utf8(), path.canonicalize_utf8()) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}

#[tracing::instrument(
    name = "handlers.module.get",
    fields(module.specifier = %specifier),
    skip_all,
)]
pub(crate) async fn get(
    State(resolver): State<Arc<AliasResolver>>,
    Path(specifier): Path<String>,
    request: Request,
) -> Result<Response, RouteError> {
    let (rule, path) = match resolver.resolve_existing(&specifier)? {
        Resolution::Aliased { rule, path } => (rule, path),
        Resolution::Passthrough(specifier) => {
            return Err(RouteError::NoMatchingRule(specifier.to_owned()));
        }
    };

    let root = resolver.rules()[rule].root();
    if !is_within(&root, &path) {
        tracing::warn!(%path, %root, "Refusing to serve a module outside of the aliased directory");
        return Err(RouteError::OutsideRoot(specifier));
    }

    let mut response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .into_response();

    if response.status().is_success() && is_script(&path) {
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/javascript; charset=utf-8"),
        );
    }

    Ok(response)
}
