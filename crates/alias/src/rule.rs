// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use thiserror::Error;

use crate::{Template, TemplateError};

/// Errors which can happen when building an [`AliasRule`]
#[derive(Debug, Error)]
pub enum RuleError {
    /// The pattern is not a valid regular expression
    #[error("invalid alias pattern {pattern:?}")]
    InvalidPattern {
        /// The pattern as written
        pattern: String,

        /// The underlying regex error
        #[source]
        source: Box<regex::Error>,
    },

    /// The pattern does not have exactly one capturing group
    #[error("alias pattern {pattern:?} must have exactly one capturing group, found {count}")]
    CaptureGroups {
        /// The pattern as written
        pattern: String,

        /// How many capturing groups the pattern has
        count: usize,
    },

    /// The replacement template is invalid
    #[error("invalid alias replacement {template:?}")]
    InvalidTemplate {
        /// The template as written
        template: String,

        /// What is wrong with the template
        #[source]
        source: TemplateError,
    },
}

/// A single alias rule, mapping specifiers which match a pattern to a path.
///
/// The pattern always has to match the whole specifier. Its only capturing
/// group is substituted in the template, and the result is joined to the
/// base directory, which is the directory of the configuration file
/// declaring the rule.
#[derive(Debug, Clone)]
pub struct AliasRule {
    find: String,
    pattern: Regex,
    template: Template,
    base_dir: Utf8PathBuf,
}

impl AliasRule {
    /// Build and validate an alias rule
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regular expression, if
    /// it does not have exactly one capturing group, or if the template is
    /// invalid.
    pub fn new(
        find: &str,
        replacement: &str,
        base_dir: impl Into<Utf8PathBuf>,
    ) -> Result<Self, RuleError> {
        // The non-capturing group keeps alternations from escaping the anchors
        let pattern = Regex::new(&format!("^(?:{find})$")).map_err(|source| {
            RuleError::InvalidPattern {
                pattern: find.to_owned(),
                source: Box::new(source),
            }
        })?;

        // `captures_len` includes the implicit group for the whole match
        let count = pattern.captures_len() - 1;
        if count != 1 {
            return Err(RuleError::CaptureGroups {
                pattern: find.to_owned(),
                count,
            });
        }

        let template =
            Template::parse(replacement).map_err(|source| RuleError::InvalidTemplate {
                template: replacement.to_owned(),
                source,
            })?;

        Ok(Self {
            find: find.to_owned(),
            pattern,
            template,
            base_dir: base_dir.into(),
        })
    }

    /// The pattern, as it was written
    #[must_use]
    pub fn find(&self) -> &str {
        &self.find
    }

    /// The replacement template
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The directory resolved paths are relative to
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// The directory every path resolved by this rule is written under: the
    /// directory part of the template text before the placeholder, joined to
    /// the base directory.
    ///
    /// Nothing stops a captured `..` from climbing out of it, callers exposing
    /// files have to check the resolved path against it.
    #[must_use]
    pub fn root(&self) -> Utf8PathBuf {
        let prefix = self.template.prefix();
        match prefix.rfind('/') {
            Some(end) => self.base_dir.join(&prefix[..end]),
            None => self.base_dir.clone(),
        }
    }

    /// Check whether this rule applies to the given specifier
    #[must_use]
    pub fn matches(&self, specifier: &str) -> bool {
        self.pattern.is_match(specifier)
    }

    /// Resolve a specifier to a path.
    ///
    /// Returns [`None`] if the specifier does not match the pattern. This
    /// does not check that the resulting path exists.
    #[must_use]
    pub fn resolve(&self, specifier: &str) -> Option<Utf8PathBuf> {
        let captures = self.pattern.captures(specifier)?;
        // An optional group which did not participate in the match is empty
        let capture = captures.get(1).map_or("", |m| m.as_str());
        Some(self.base_dir.join(self.template.expand(capture)))
    }
}

impl std::fmt::Display for AliasRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/ -> {}/{}", self.find, self.base_dir, self.template)
    }
}
