// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use athena_alias::{AliasResolver, AliasRule};
use athena_config::{AllowedHosts, PluginsConfig, SHARED_ALIAS_FIND, SHARED_ALIAS_REPLACEMENT};
use axum::body::Body;
use camino::{Utf8Path, Utf8PathBuf};
use http_body_util::BodyExt;
use hyper::{
    Request, Response, StatusCode,
    header::{CONTENT_TYPE, HOST, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::AppState;

/// Setup tracing for tests.
#[allow(unused_must_use)]
pub(crate) fn setup() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

/// A dashboard next to a shared package, in a temporary directory:
///
/// ```text
/// dashboard/index.html
/// dashboard/assets/app.css
/// shared/src/foo.ts
/// shared/src/nested/bar.ts
/// ```
pub(crate) struct TestState {
    dir: TempDir,
    state: AppState,
}

impl TestState {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();

        let dashboard = root.join("dashboard");
        std::fs::create_dir_all(dashboard.join("assets")).unwrap();
        std::fs::write(dashboard.join("index.html"), "<div id=\"app\"></div>\n").unwrap();
        std::fs::write(dashboard.join("assets/app.css"), "body { margin: 0; }\n").unwrap();

        let shared = root.join("shared/src");
        std::fs::create_dir_all(shared.join("nested")).unwrap();
        std::fs::write(shared.join("foo.ts"), "export const foo = 1;\n").unwrap();
        std::fs::write(shared.join("nested/bar.ts"), "export const bar = 2;\n").unwrap();

        // Reachable from the shared sources through `..`
        std::fs::write(root.join("secret.ts"), "export const token = 'hunter2';\n").unwrap();

        let rule =
            AliasRule::new(SHARED_ALIAS_FIND, SHARED_ALIAS_REPLACEMENT, dashboard.clone()).unwrap();

        let state = AppState {
            resolver: Arc::new(AliasResolver::new([rule])),
            allowed_hosts: Arc::new(AllowedHosts::default()),
            root: dashboard,
            plugins: Arc::new(PluginsConfig::default()),
            version: "0.0.0-test",
        };

        Self { dir, state }
    }

    pub fn with_allowed_hosts(mut self, allowed_hosts: AllowedHosts) -> Self {
        self.state.allowed_hosts = Arc::new(allowed_hosts);
        self
    }

    /// The directory the alias rule and the static files are relative to
    pub fn dashboard_dir(&self) -> Utf8PathBuf {
        Utf8Path::from_path(self.dir.path())
            .unwrap()
            .join("dashboard")
    }

    pub async fn request(&self, request: Request<String>) -> Response<String> {
        let response = crate::router(self.state.clone())
            .oneshot(request.map(Body::new))
            .await
            .unwrap();

        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        Response::from_parts(parts, body)
    }
}

pub(crate) trait RequestBuilderExt {
    /// Sets the request Host header.
    fn host(self, host: &str) -> Self;

    /// Builds the request with an empty body.
    fn empty(self) -> hyper::Request<String>;
}

impl RequestBuilderExt for hyper::http::request::Builder {
    fn host(mut self, host: &str) -> Self {
        self.headers_mut()
            .unwrap()
            .insert(HOST, HeaderValue::from_str(host).unwrap());
        self
    }

    fn empty(self) -> hyper::Request<String> {
        self.body(String::new()).unwrap()
    }
}

pub(crate) trait ResponseExt {
    /// Asserts that the response has the given status code.
    ///
    /// # Panics
    ///
    /// Panics if the response has a different status code.
    fn assert_status(&self, status: StatusCode);

    /// Asserts that the response has the given header value.
    ///
    /// # Panics
    ///
    /// Panics if the response does not have the given header or if the header
    /// value does not match.
    fn assert_header_value(&self, header: HeaderName, value: &str);

    /// Get the response body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the response is missing the `Content-Type: application/json`,
    /// or if the body is not valid JSON.
    fn json<T: DeserializeOwned>(&self) -> T;
}

impl ResponseExt for Response<String> {
    #[track_caller]
    fn assert_status(&self, status: StatusCode) {
        assert_eq!(
            self.status(),
            status,
            "HTTP status code mismatch: got {}, expected {}. Body: {}",
            self.status(),
            status,
            self.body()
        );
    }

    #[track_caller]
    fn assert_header_value(&self, header: HeaderName, value: &str) {
        let actual_value = self
            .headers()
            .get(&header)
            .unwrap_or_else(|| panic!("Missing header {header}"));

        assert_eq!(
            actual_value,
            value,
            "Header mismatch: got {:?}, expected {:?}",
            self.headers().get(header),
            value
        );
    }

    #[track_caller]
    fn json<T: DeserializeOwned>(&self) -> T {
        self.assert_header_value(CONTENT_TYPE, "application/json");
        serde_json::from_str(self.body()).expect("JSON deserialization failed")
    }
}
