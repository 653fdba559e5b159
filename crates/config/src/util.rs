// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::{Utf8Path, Utf8PathBuf};
use figment::{Figment, value::magic::RelativePathBuf};
use serde::de::DeserializeOwned;

/// The error type returned when loading or validating a section
pub type ConfigError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait implemented by all configuration section to help loading specific part
/// of the config.
pub trait ConfigurationSection: Sized + DeserializeOwned {
    /// Specify where this section should live relative to the root.
    const PATH: Option<&'static str> = None;

    /// Validate the configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    fn validate(&self, _figment: &Figment) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Extract configuration from a Figment instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be loaded
    fn extract(figment: &Figment) -> Result<Self, ConfigError> {
        let this: Self = if let Some(path) = Self::PATH {
            figment.extract_inner(path)?
        } else {
            figment.extract()?
        };

        this.validate(figment)?;
        Ok(this)
    }
}

/// Extension trait for [`ConfigurationSection`] to allow extracting the
/// configuration section from a [`Figment`] or return the default value if the
/// section is not present.
pub trait ConfigurationSectionExt: ConfigurationSection + Default {
    /// Extract the configuration section from the given [`Figment`], or return
    /// the default value if the section is not present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration section is invalid.
    fn extract_or_default(figment: &Figment) -> Result<Self, ConfigError> {
        let this: Self = if let Some(path) = Self::PATH {
            if !figment.contains(path) {
                let this = Self::default();
                this.validate(figment)?;
                return Ok(this);
            }

            figment.extract_inner(path)?
        } else {
            figment.extract()?
        };

        this.validate(figment)?;
        Ok(this)
    }
}

impl<T: ConfigurationSection + Default> ConfigurationSectionExt for T {}

/// Split a [`RelativePathBuf`] into the path as it was written and the
/// directory of the file it was written in.
///
/// Values which did not come from a file (defaults, environment variables)
/// are relative to `fallback_dir`.
pub(crate) fn split_relative_path(
    path: &RelativePathBuf,
    fallback_dir: &Utf8Path,
) -> anyhow::Result<(String, Utf8PathBuf)> {
    let original = path
        .original()
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("path {:?} is not valid UTF-8", path.original()))?
        .to_owned();

    let base_dir = match path
        .metadata_path()
        .and_then(std::path::Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        Some(dir) => Utf8PathBuf::try_from(dir.to_path_buf())?,
        None => fallback_dir.to_owned(),
    };

    Ok((original, base_dir))
}

/// The current working directory, used as a base for values which were not
/// loaded from a file
pub(crate) fn current_dir() -> anyhow::Result<Utf8PathBuf> {
    let dir = std::env::current_dir()?;
    Ok(Utf8PathBuf::try_from(dir)?)
}
