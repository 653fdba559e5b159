// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use anyhow::Context;
use athena_alias::{AliasResolver, AliasRule};
use camino::Utf8Path;
use figment::value::magic::RelativePathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use crate::{
    ConfigurationSection,
    schema::Pattern,
    util::{current_dir, split_relative_path},
};

/// The pattern of the default alias, mapping the shared package namespace
pub const SHARED_ALIAS_FIND: &str = "^@athena/shared/(.+)$";

/// The replacement of the default alias, relative to the configuration file
pub const SHARED_ALIAS_REPLACEMENT: &str = "../shared/src/$1.ts";

fn find_example() -> &'static str {
    SHARED_ALIAS_FIND
}

fn replacement_example() -> &'static str {
    SHARED_ALIAS_REPLACEMENT
}

/// An alias rule, rewriting import specifiers to source files
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct AliasConfig {
    /// Regular expression the whole specifier has to match. It must have
    /// exactly one capturing group.
    #[schemars(with = "Pattern", example = "find_example")]
    pub find: String,

    /// Path the specifier is rewritten to. `$1` (or `${1}`) is replaced by
    /// the captured part of the specifier, and `$$` is a literal dollar sign.
    ///
    /// Relative paths are relative to the directory of the configuration
    /// file where this rule is declared.
    #[serde(serialize_with = "RelativePathBuf::serialize_relative")]
    #[schemars(with = "String", example = "replacement_example")]
    pub replacement: RelativePathBuf,
}

impl AliasConfig {
    /// Build the alias rule out of this configuration
    ///
    /// `fallback_dir` is used as the base directory if the rule was not
    /// loaded from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern or the replacement is invalid
    pub fn rule(&self, fallback_dir: &Utf8Path) -> anyhow::Result<AliasRule> {
        let (replacement, base_dir) = split_relative_path(&self.replacement, fallback_dir)?;
        let rule = AliasRule::new(&self.find, &replacement, base_dir)?;
        Ok(rule)
    }
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            find: SHARED_ALIAS_FIND.to_owned(),
            replacement: RelativePathBuf::from(SHARED_ALIAS_REPLACEMENT),
        }
    }
}

/// Configuration related to the resolution of import specifiers
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ResolveConfig {
    /// Alias rules, in priority order. The first rule matching a specifier
    /// wins, and specifiers which match no rule are left untouched.
    #[serde(default = "default_aliases")]
    pub aliases: Vec<AliasConfig>,
}

fn default_aliases() -> Vec<AliasConfig> {
    vec![AliasConfig::default()]
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
        }
    }
}

impl ResolveConfig {
    /// Build the alias resolver out of this configuration
    ///
    /// # Errors
    ///
    /// Returns an error if one of the rules is invalid, or if the current
    /// directory could not be determined
    pub fn resolver(&self) -> anyhow::Result<AliasResolver> {
        let fallback_dir = current_dir().context("could not determine the current directory")?;
        self.aliases
            .iter()
            .enumerate()
            .map(|(index, alias)| {
                alias
                    .rule(&fallback_dir)
                    .with_context(|| format!("invalid alias rule #{index}"))
            })
            .collect()
    }
}

impl ConfigurationSection for ResolveConfig {
    const PATH: Option<&'static str> = Some("resolve");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        // The fallback directory does not change whether a rule is valid
        let fallback_dir = Utf8Path::new(".");
        for (index, alias) in self.aliases.iter().enumerate() {
            if let Err(err) = alias.rule(fallback_dir) {
                return Err(figment::error::Error::custom(format!("{err:#}"))
                    .with_path(&format!("aliases.{index}"))
                    .into());
            }
        }

        Ok(())
    }
}
