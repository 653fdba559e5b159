// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(missing_docs, rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

//! Rewrite rules for import specifiers.
//!
//! An [`AliasRule`] maps a namespaced import specifier such as
//! `@athena/shared/foo` onto a source file, relative to the directory of the
//! configuration file which declared the rule. Rules are validated once, when
//! they are built, and are immutable afterwards: resolving a specifier is a
//! pure function which never touches the filesystem.
//!
//! ```
//! use athena_alias::{AliasResolver, AliasRule, Resolution};
//!
//! let rule = AliasRule::new("^@athena/shared/(.+)$", "../shared/src/$1.ts", "/app/dashboard")?;
//! let resolver = AliasResolver::new([rule]);
//!
//! assert_eq!(
//!     resolver.resolve("@athena/shared/foo").path().map(|p| p.as_str()),
//!     Some("/app/dashboard/../shared/src/foo.ts"),
//! );
//! assert_eq!(resolver.resolve("vue"), Resolution::Passthrough("vue"));
//! # Ok::<(), athena_alias::RuleError>(())
//! ```

mod resolver;
mod rule;
mod template;

pub use self::{
    resolver::{AliasResolver, Resolution, ResolveError},
    rule::{AliasRule, RuleError},
    template::{Template, TemplateError},
};
