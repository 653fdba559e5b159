// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod plugins;
mod resolve;
mod server;

pub use self::{
    plugins::{
        PluginConfig, PluginsConfig, TailwindPluginConfig, VueCompilerOptions, VuePluginConfig,
        VueTemplateConfig, Whitespace,
    },
    resolve::{AliasConfig, ResolveConfig, SHARED_ALIAS_FIND, SHARED_ALIAS_REPLACEMENT},
    server::{AllowedHosts, DEFAULT_PORT, ServerConfig},
};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Resolution of import specifiers
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Configuration of the dev server
    #[serde(default)]
    pub server: ServerConfig,

    /// The ordered list of build plugins
    #[serde(default)]
    pub plugins: PluginsConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.resolve.validate(figment)?;
        self.server.validate(figment)?;
        self.plugins.validate(figment)?;

        Ok(())
    }
}

impl RootConfig {
    /// Generate the default configuration: the shared package alias, a server
    /// listening on all interfaces, and the Vue and Tailwind plugins.
    #[must_use]
    pub fn generate() -> Self {
        Self::default()
    }
}
