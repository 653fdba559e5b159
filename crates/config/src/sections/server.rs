// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::net::IpAddr;

use camino::Utf8PathBuf;
use figment::value::magic::RelativePathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use crate::{
    ConfigurationSection,
    schema::Hostname,
    util::{current_dir, split_relative_path},
};

/// The port the dev server listens on by default
pub const DEFAULT_PORT: u16 = 3002;

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_root() -> RelativePathBuf {
    RelativePathBuf::from(".")
}

fn host_example() -> &'static str {
    "127.0.0.1"
}

/// Which values of the `Host` header the dev server accepts
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum AllowedHosts {
    /// `true` accepts any host, `false` only the always-allowed ones
    Flag(bool),

    /// A list of allowed host names. An entry starting with a dot, like
    /// `.example.com`, allows `example.com` and all of its subdomains.
    List(#[schemars(with = "Vec<Hostname>")] Vec<String>),
}

impl Default for AllowedHosts {
    fn default() -> Self {
        Self::Flag(true)
    }
}

impl AllowedHosts {
    /// Returns true if any host is allowed
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Flag(true))
    }

    /// Check whether a host name (without the port) is allowed.
    ///
    /// `localhost`, its subdomains and IP addresses are always allowed.
    #[must_use]
    pub fn allows(&self, hostname: &str) -> bool {
        if self.is_any() {
            return true;
        }

        let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();

        if hostname == "localhost" || hostname.ends_with(".localhost") {
            return true;
        }

        // IPv6 literals are bracketed in the Host header
        let bare = hostname
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&hostname);
        if bare.parse::<IpAddr>().is_ok() {
            return true;
        }

        let Self::List(list) = self else {
            return false;
        };

        list.iter().any(|entry| {
            let entry = entry.to_ascii_lowercase();
            match entry.strip_prefix('.') {
                Some(domain) => {
                    hostname == domain
                        || hostname
                            .strip_suffix(domain)
                            .is_some_and(|sub| sub.ends_with('.'))
                }
                None => hostname == entry,
            }
        })
    }
}

/// Configuration of the dev server
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ServerConfig {
    /// Address to bind on. Defaults to `0.0.0.0`, all IPv4 interfaces.
    #[serde(default = "default_host")]
    #[schemars(example = "host_example")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host header values to accept. Defaults to `true`, accepting any host.
    #[serde(default)]
    pub allowed_hosts: AllowedHosts,

    /// Directory served as static content, relative to the configuration
    /// file. Defaults to the directory of the configuration file.
    #[serde(
        default = "default_root",
        serialize_with = "RelativePathBuf::serialize_relative"
    )]
    #[schemars(with = "String")]
    pub root: RelativePathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_hosts: AllowedHosts::default(),
            root: default_root(),
        }
    }
}

impl ServerConfig {
    /// The directory served as static content
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not valid UTF-8 or if the current
    /// directory could not be determined
    pub fn root_dir(&self) -> anyhow::Result<Utf8PathBuf> {
        let (root, base_dir) = split_relative_path(&self.root, &current_dir()?)?;
        Ok(base_dir.join(root))
    }
}

impl ConfigurationSection for ServerConfig {
    const PATH: Option<&'static str> = Some("server");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if self.host.trim().is_empty() {
            return Err(figment::error::Error::custom("host must not be empty")
                .with_path("host")
                .into());
        }

        if let AllowedHosts::List(list) = &self.allowed_hosts
            && let Some(index) = list.iter().position(|h| h.trim_start_matches('.').is_empty())
        {
            return Err(figment::error::Error::custom("allowed host must not be empty")
                .with_path(&format!("allowed_hosts.{index}"))
                .into());
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
                    server:
                      host: 127.0.0.1
                      port: 4000
                      allowed_hosts:
                        - dashboard.example.com
                        - .athena.test
                      root: public
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            let config = ServerConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 4000);
            assert_eq!(
                config.allowed_hosts,
                AllowedHosts::List(vec![
                    "dashboard.example.com".to_owned(),
                    ".athena.test".to_owned()
                ])
            );

            let root = config.root_dir().map_err(|e| e.to_string())?;
            assert_eq!(root.as_std_path(), jail.directory().join("public"));

            Ok(())
        });
    }

    #[test]
    fn defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "athena.yaml",
                indoc! {r"
                    server:
                      allowed_hosts: true
                "},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            let config = ServerConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.port, 3002);
            assert!(config.allowed_hosts.is_any());

            Ok(())
        });
    }

    #[test]
    fn rejects_empty_allowed_host() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "athena.yaml",
                indoc! {r#"
                    server:
                      allowed_hosts: ["ok.example.com", "."]
                "#},
            )?;

            let figment = Figment::new().merge(Yaml::file("athena.yaml"));
            assert!(ServerConfig::extract(&figment).is_err());

            Ok(())
        });
    }

    #[test]
    fn any_host_is_allowed() {
        let allowed = AllowedHosts::Flag(true);
        assert!(allowed.allows("evil.example.com"));
        assert!(allowed.allows("whatever"));
    }

    #[test]
    fn always_allowed_hosts() {
        let allowed = AllowedHosts::Flag(false);
        assert!(allowed.allows("localhost"));
        assert!(allowed.allows("LOCALHOST"));
        assert!(allowed.allows("app.localhost"));
        assert!(allowed.allows("127.0.0.1"));
        assert!(allowed.allows("192.168.1.20"));
        assert!(allowed.allows("[::1]"));
        assert!(!allowed.allows("example.com"));
        assert!(!allowed.allows("localhost.example.com"));
    }

    #[test]
    fn host_list() {
        let allowed = AllowedHosts::List(vec![
            "dashboard.example.com".to_owned(),
            ".athena.test".to_owned(),
        ]);

        assert!(allowed.allows("dashboard.example.com"));
        assert!(allowed.allows("Dashboard.Example.com."));
        assert!(!allowed.allows("other.example.com"));
        assert!(!allowed.allows("sub.dashboard.example.com"));

        assert!(allowed.allows("athena.test"));
        assert!(allowed.allows("preview.athena.test"));
        assert!(allowed.allows("a.b.athena.test"));
        assert!(!allowed.allows("notathena.test"));
    }
}
