//! Global installs through the package manager.
use std::{
    path::{Path, PathBuf},
    process::Command,
};

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::{DefaultsFile, Paths, load_npmrc},
    constants::PACKAGE_MANAGER,
    error::{ConfigError, InstallError},
    package::{JsonManifestReader, Manifest, ManifestReader},
};

/// Installs packages under the home prefix and prepares their defaults file.
#[derive(Debug, Clone)]
pub struct Installer {
    paths: Paths,
    program: PathBuf,
}

impl Installer {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            program: PathBuf::from(PACKAGE_MANAGER),
        }
    }

    /// Uses a different package manager executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Installs `spec` globally and seeds its defaults file.
    ///
    /// Returns the path of the package defaults file.
    pub fn install(&self, spec: &str) -> Result<PathBuf, InstallError> {
        let name = package_name(spec);
        let rc = load_npmrc(&self.paths.npmrc());

        info!("Installing '{spec}' under {:?}", self.paths.home());
        let mut command = Command::new(&self.program);
        command
            .arg("install")
            .arg("--global")
            .arg("--prefix")
            .arg(self.paths.home())
            .arg(spec);
        for (key, value) in &rc {
            command.env(format!("npm_config_{}", key.replace('-', "_")), value);
        }

        let status = command.status()?;
        if !status.success() {
            return Err(InstallError::PackageManager(status.code()));
        }

        let manifest = JsonManifestReader.read(&self.paths.module_dir(name))?;
        let defaults = self.paths.package_defaults(name);
        seed_defaults(&defaults, &manifest)?;
        Ok(defaults)
    }
}

/// The package name in an install spec, without any version or tag.
pub fn package_name(spec: &str) -> &str {
    let search_from = usize::from(spec.starts_with('@'));
    match spec[search_from..].find('@') {
        Some(at) => &spec[..search_from + at],
        None => spec,
    }
}

/// Adds every variable the manifest declares under `environment` to the
/// defaults file as `null`, leaving values that are already set alone.
pub fn seed_defaults(path: &Path, manifest: &Manifest) -> Result<(), ConfigError> {
    let keys = manifest.environment_keys();
    if keys.is_empty() {
        warn!("Package declares no environment; writing empty defaults");
    }

    DefaultsFile::update(path, |file| {
        for key in keys {
            if !file.is_set(key) {
                file.set(key, Value::Null);
            }
        }
    })
}
