// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use crate::ConfigurationSection;

/// How the Vue template compiler treats whitespace between elements
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Whitespace {
    /// Remove or collapse insignificant whitespace
    #[default]
    Condense,

    /// Keep whitespace as written, so that literal code blocks are not
    /// mangled
    Preserve,
}

/// Options given to the Vue template compiler
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct VueCompilerOptions {
    /// Whitespace handling in compiled templates
    #[serde(default)]
    pub whitespace: Whitespace,
}

/// Template options of the Vue plugin
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct VueTemplateConfig {
    /// Options given to the template compiler
    #[serde(default)]
    pub compiler_options: VueCompilerOptions,
}

/// Configuration of the Vue single-file component plugin
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct VuePluginConfig {
    /// Template compilation options
    #[serde(default)]
    pub template: VueTemplateConfig,
}

/// Configuration of the Tailwind CSS plugin. It has no options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TailwindPluginConfig {}

/// A plugin of the build pipeline
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum PluginConfig {
    /// Compiles Vue single-file components
    Vue(VuePluginConfig),

    /// Generates Tailwind CSS utilities
    Tailwind(TailwindPluginConfig),
}

impl PluginConfig {
    /// The name of the plugin, as written in the configuration
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Vue(_) => "vue",
            Self::Tailwind(_) => "tailwind",
        }
    }
}

/// The ordered list of build plugins
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct PluginsConfig(pub Vec<PluginConfig>);

impl Default for PluginsConfig {
    fn default() -> Self {
        Self(vec![
            PluginConfig::Vue(VuePluginConfig {
                template: VueTemplateConfig {
                    compiler_options: VueCompilerOptions {
                        whitespace: Whitespace::Preserve,
                    },
                },
            }),
            PluginConfig::Tailwind(TailwindPluginConfig {}),
        ])
    }
}

impl PluginsConfig {
    /// Iterate over the plugins, in pipeline order
    pub fn iter(&self) -> std::slice::Iter<'_, PluginConfig> {
        self.0.iter()
    }

    /// The names of the plugins, in pipeline order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(PluginConfig::name).collect()
    }
}

impl<'a> IntoIterator for &'a PluginsConfig {
    type Item = &'a PluginConfig;
    type IntoIter = std::slice::Iter<'a, PluginConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl ConfigurationSection for PluginsConfig {
    const PATH: Option<&'static str> = Some("plugins");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        for (index, plugin) in self.iter().enumerate() {
            let name = plugin.name();
            if self.0[..index].iter().any(|p| p.name() == name) {
                return Err(figment::error::Error::custom(format!(
                    "plugin `{name}` is listed more than once"
                ))
                .with_path(&index.to_string())
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };
    use indoc::indoc;

    use super::*;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "athena.yaml",
                indoc! {r"
                    plugins:
                      - name: vue
                        template:
                          compiler_options:
                            whitespace: preserve
                      - name: tailwind
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            let config = PluginsConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config, PluginsConfig::default());
            assert_eq!(config.names(), vec!["vue", "tailwind"]);

            Ok(())
        });
    }

    #[test]
    fn order_is_preserved() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "athena.yaml",
                indoc! {r"
                    plugins:
                      - name: tailwind
                      - name: vue
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            let config = PluginsConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.names(), vec!["tailwind", "vue"]);
            // The Vue compiler condenses whitespace unless told otherwise
            assert_eq!(
                config.0[1],
                PluginConfig::Vue(VuePluginConfig::default())
            );

            Ok(())
        });
    }

    #[test]
    fn rejects_duplicates() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "athena.yaml",
                indoc! {r"
                    plugins:
                      - name: vue
                      - name: tailwind
                      - name: vue
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            let err = PluginsConfig::extract(&figment).unwrap_err();
            assert!(err.to_string().contains("more than once"), "{err}");

            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_plugins() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "athena.yaml",
                indoc! {r"
                    plugins:
                      - name: react
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            assert!(PluginsConfig::extract(&figment).is_err());

            Ok(())
        });
    }
}
