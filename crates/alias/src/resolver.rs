// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::AliasRule;

/// The outcome of resolving a specifier through an [`AliasResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A rule matched the specifier
    Aliased {
        /// Index of the rule which matched
        rule: usize,

        /// The path the specifier was rewritten to
        path: Utf8PathBuf,
    },

    /// No rule matched, the specifier is left untouched for the next resolver
    Passthrough(&'a str),
}

impl Resolution<'_> {
    /// The rewritten path, if any rule matched
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Aliased { path, .. } => Some(path),
            Self::Passthrough(_) => None,
        }
    }

    /// Returns true if a rule matched
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        matches!(self, Self::Aliased { .. })
    }
}

/// Errors which can happen when resolving a specifier to an existing file
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A rule matched, but the path it produced is not a file
    #[error("module {specifier:?} was aliased to {path:?}, which is not a file")]
    ModuleNotFound {
        /// The specifier which was requested
        specifier: String,

        /// The path it was resolved to
        path: Utf8PathBuf,
    },
}

/// An ordered chain of alias rules, where the first matching rule wins
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    rules: Vec<AliasRule>,
}

impl AliasResolver {
    /// Create a resolver from a list of rules, in priority order
    #[must_use]
    pub fn new(rules: impl IntoIterator<Item = AliasRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// The rules of this resolver, in priority order
    #[must_use]
    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    /// Resolve a specifier through the rules
    #[must_use]
    pub fn resolve<'a>(&self, specifier: &'a str) -> Resolution<'a> {
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(path) = rule.resolve(specifier) {
                tracing::debug!(specifier, rule = index, %path, "Aliased import specifier");
                return Resolution::Aliased { rule: index, path };
            }
        }

        Resolution::Passthrough(specifier)
    }

    /// Resolve a specifier through the rules, checking that the aliased path
    /// points to a file.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ModuleNotFound`] if a rule matched but the
    /// resulting path is not a file.
    pub fn resolve_existing<'a>(&self, specifier: &'a str) -> Result<Resolution<'a>, ResolveError> {
        let resolution = self.resolve(specifier);
        if let Some(path) = resolution.path()
            && !path.is_file()
        {
            return Err(ResolveError::ModuleNotFound {
                specifier: specifier.to_owned(),
                path: path.to_owned(),
            });
        }

        Ok(resolution)
    }
}

impl FromIterator<AliasRule> for AliasResolver {
    fn from_iter<T: IntoIterator<Item = AliasRule>>(iter: T) -> Self {
        Self::new(iter)
    }
}
