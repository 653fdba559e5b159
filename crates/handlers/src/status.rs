// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{Json, extract::State};
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct AliasStatus {
    find: String,
    replacement: String,
    base_dir: Utf8PathBuf,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    version: &'static str,
    aliases: Vec<AliasStatus>,
    plugins: Vec<&'static str>,
}

pub(crate) async fn get(State(state): State<AppState>) -> Json<StatusResponse> {
    let aliases = state
        .resolver
        .rules()
        .iter()
        .map(|rule| AliasStatus {
            find: rule.find().to_owned(),
            replacement: rule.template().as_str().to_owned(),
            base_dir: rule.base_dir().to_owned(),
        })
        .collect();

    Json(StatusResponse {
        version: state.version,
        aliases,
        plugins: state.plugins.names(),
    })
}

#[cfg(test)]
mod tests {
    use hyper::{Request, StatusCode};

    use crate::test_utils::{RequestBuilderExt, ResponseExt, TestState, setup};

    #[tokio::test]
    async fn reports_aliases_and_plugins() {
        setup();
        let state = TestState::new();

        let request = Request::get("/__athena/status").empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);

        let body: serde_json::Value = response.json();
        assert_eq!(body["version"], "0.0.0-test");
        assert_eq!(body["plugins"], serde_json::json!(["vue", "tailwind"]));
        assert_eq!(body["aliases"][0]["find"], "^@athena/shared/(.+)$");
        assert_eq!(body["aliases"][0]["replacement"], "../shared/src/$1.ts");
        assert_eq!(
            body["aliases"][0]["base_dir"],
            state.dashboard_dir().as_str()
        );
    }
}
