// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

mod config;
mod resolve;
mod server;

/// The configuration file loaded when none is given
const DEFAULT_CONFIG: &str = "athena.yaml";

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Runs the dev server
    Server(self::server::Options),

    /// Resolve import specifiers through the alias rules
    Resolve(self::resolve::Options),
}

#[derive(Parser, Debug)]
#[command(name = "athena-dev", version = crate::VERSION)]
pub struct Options {
    /// Path to the configuration file. Can be repeated, later files are
    /// merged on top of earlier ones.
    #[arg(short, long, global = true, action = clap::ArgAction::Append)]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Option<Subcommand>,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            Some(S::Config(c)) => c.run(figment).await,
            Some(S::Server(c)) => c.run(figment).await,
            Some(S::Resolve(c)) => c.run(figment).await,
            None => self::server::Options::default().run(figment).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the ATHENA_CONFIG environment variable
            std::env::var("ATHENA_CONFIG")
                // Split the environment variable
                .map(|config| config.split(':').map(Utf8PathBuf::from).collect())
                // Default to "athena.yaml" if ATHENA_CONFIG is not set
                .unwrap_or_else(|_| vec![DEFAULT_CONFIG.into()])
        } else {
            self.config.clone()
        };

        // Files are appended in order, arrays like the alias rules are
        // concatenated
        let base = configs
            .iter()
            .fold(Figment::new(), |f, path| f.admerge(Yaml::file(path)));

        // Environment variables take precedence over the files. Sections are
        // separated by a double underscore, since keys contain single ones:
        // ATHENA_SERVER__ALLOWED_HOSTS sets `server.allowed_hosts`
        base.merge(Env::prefixed("ATHENA_").split("__").ignore(&["config"]))
    }
}

#[cfg(test)]
mod tests {
    use athena_config::{ConfigurationSection, RootConfig};
    use figment::Jail;
    use indoc::indoc;

    use super::*;

    #[test]
    fn config_files_are_merged_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "base.yaml",
                indoc! {r#"
                    server:
                      port: 4000
                    resolve:
                      aliases:
                        - find: "^@a/(.+)$"
                          replacement: "a/$1.ts"
                "#},
            )?;
            jail.create_file(
                "local.yaml",
                indoc! {r#"
                    server:
                      port: 5000
                    resolve:
                      aliases:
                        - find: "^@b/(.+)$"
                          replacement: "b/$1.ts"
                "#},
            )?;

            let options = Options::try_parse_from([
                "athena-dev",
                "-c",
                "base.yaml",
                "-c",
                "local.yaml",
                "config",
                "check",
            ])
            .map_err(|e| e.to_string())?;
            let config = RootConfig::extract(&options.figment()).map_err(|e| e.to_string())?;

            assert_eq!(config.server.port, 5000);
            assert_eq!(config.resolve.aliases.len(), 2);

            Ok(())
        });
    }

    #[test]
    fn config_from_the_environment() {
        Jail::expect_with(|jail| {
            jail.create_file("athena.yaml", "server:\n  port: 4000\n")?;
            jail.create_file("other.yaml", "server:\n  host: 127.0.0.1\n")?;

            let options = Options::try_parse_from(["athena-dev"]).map_err(|e| e.to_string())?;
            let config = RootConfig::extract(&options.figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 4000);

            jail.set_env("ATHENA_CONFIG", "other.yaml");
            jail.set_env("ATHENA_SERVER__PORT", "4100");
            let config = RootConfig::extract(&options.figment()).map_err(|e| e.to_string())?;
            assert_eq!(config.server.host, "127.0.0.1");
            assert_eq!(config.server.port, 4100);
            assert!(config.server.allowed_hosts.is_any());

            jail.set_env("ATHENA_SERVER__ALLOWED_HOSTS", "false");
            let config = RootConfig::extract(&options.figment()).map_err(|e| e.to_string())?;
            assert!(!config.server.allowed_hosts.is_any());
            assert!(!config.server.allowed_hosts.allows("evil.example.com"));

            Ok(())
        });
    }
}
