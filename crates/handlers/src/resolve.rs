// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use athena_alias::{AliasResolver, Resolution};
use axum::{
    Json,
    extract::{Query, State},
};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct Params {
    specifier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ResolveResponse {
    /// The specifier which was resolved
    specifier: String,

    /// The path it resolved to, or `null` if it was left untouched
    resolved: Option<Utf8PathBuf>,

    /// The index of the rule which matched
    rule: Option<usize>,
}

#[tracing::instrument(
    name = "handlers.resolve.get",
    fields(module.specifier = %params.specifier),
    skip_all,
)]
pub(crate) async fn get(
    State(resolver): State<Arc<AliasResolver>>,
    Query(params): Query<Params>,
) -> Json<ResolveResponse> {
    let (resolved, rule) = match resolver.resolve(&params.specifier) {
        Resolution::Aliased { rule, path } => (Some(path), Some(rule)),
        Resolution::Passthrough(_) => (None, None),
    };

    Json(ResolveResponse {
        specifier: params.specifier,
        resolved,
        rule,
    })
}
