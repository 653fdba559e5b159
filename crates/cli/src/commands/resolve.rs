// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use athena_alias::{AliasResolver, Resolution, ResolveError};
use athena_config::{ConfigurationSectionExt, ResolveConfig};
use clap::Parser;
use console::style;
use figment::Figment;
use tokio::io::AsyncWriteExt;
use tracing::{info_span, warn};

#[derive(Parser, Debug)]
pub(super) struct Options {
    /// The import specifiers to resolve
    #[arg(required = true)]
    specifiers: Vec<String>,

    /// Fail if an aliased specifier does not point to an existing file
    #[arg(long)]
    check: bool,
}

/// Resolve each specifier and describe the result, one per line. Returns the
/// number of specifiers which were aliased to a missing file, if `check` is
/// set.
fn describe(resolver: &AliasResolver, specifiers: &[String], check: bool) -> (String, usize) {
    let mut output = String::new();
    let mut missing = 0;

    for specifier in specifiers {
        let resolution = if check {
            resolver.resolve_existing(specifier)
        } else {
            Ok(resolver.resolve(specifier))
        };

        let line = match resolution {
            Ok(Resolution::Aliased { path, .. }) => format!("{specifier} -> {path}\n"),
            Ok(Resolution::Passthrough(_)) => {
                format!("{specifier} {}\n", style("(passthrough)").dim())
            }
            Err(e) => {
                warn!(error = &e as &dyn std::error::Error, "Module not found");
                missing += 1;
                let ResolveError::ModuleNotFound { path, .. } = &e;
                format!("{specifier} -> {path} {}\n", style("(not found)").red())
            }
        };
        output.push_str(&line);
    }

    (output, missing)
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let _span = info_span!("cli.resolve").entered();

        let config =
            ResolveConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let resolver = config.resolver()?;

        let (output, missing) = describe(&resolver, &self.specifiers, self.check);
        tokio::io::stdout().write_all(output.as_bytes()).await?;

        if missing > 0 {
            tracing::error!("{missing} specifier(s) resolved to a missing module");
            return Ok(ExitCode::FAILURE);
        }

        Ok(ExitCode::SUCCESS)
    }
}
