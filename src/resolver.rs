//! Turns package references into job specifications.
use std::{
    collections::BTreeMap,
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    config::{Paths, Settings},
    constants::{RELATIVE_PATH_TEMPLATE, RUNTIME_DIR_KEYS},
    error::ResolveError,
    interpolate::{Context, Interpolator, UnresolvedPolicy},
    job::JobSpec,
    layers::{Layer, LayeredConfig},
    package::{
        CommandParser, CreateDirAll, DirEnsure, JsonManifestReader, ManifestReader,
        ModulePathResolver, PackageRef, PathResolver, ShellCommandParser,
    },
};

/// The invoking process as it looked when npkg started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Full environment.
    pub env: BTreeMap<String, String>,
    pub hostname: String,
    pub tmpdir: PathBuf,
}

impl Invocation {
    /// Snapshots the current process.
    pub fn capture() -> std::io::Result<Self> {
        let env = utf8_env(env::vars_os());
        let hostname = nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_default();

        Ok(Self {
            cwd: env::current_dir()?,
            env,
            hostname,
            tmpdir: env::temp_dir(),
        })
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }
}

/// Keeps the variables that are valid UTF-8. Config layers and interpolation
/// work on strings, so the rest cannot be passed on; each one is logged.
fn utf8_env<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                warn!("Not passing on {key}: value is not valid UTF-8");
                None
            }
            (Err(key), _) => {
                warn!("Not passing on {:?}: name is not valid UTF-8", key);
                None
            }
        })
        .collect()
}

/// Builds job specifications from package references.
pub struct JobResolver {
    paths: Paths,
    invocation: Invocation,
    policy: UnresolvedPolicy,
    manifests: Box<dyn ManifestReader>,
    parser: Box<dyn CommandParser>,
    locator: Box<dyn PathResolver>,
    dirs: Box<dyn DirEnsure>,
}

impl JobResolver {
    /// A resolver wired to the real filesystem.
    pub fn new(settings: &Settings, invocation: Invocation) -> Self {
        let paths = settings.paths();
        Self {
            locator: Box::new(ModulePathResolver::new(paths.clone())),
            paths,
            invocation,
            policy: settings.policy,
            manifests: Box::new(JsonManifestReader),
            parser: Box::new(ShellCommandParser),
            dirs: Box::new(CreateDirAll),
        }
    }

    pub fn with_manifest_reader(mut self, reader: impl ManifestReader + 'static) -> Self {
        self.manifests = Box::new(reader);
        self
    }

    pub fn with_command_parser(mut self, parser: impl CommandParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn with_path_resolver(mut self, locator: impl PathResolver + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn with_dir_ensure(mut self, dirs: impl DirEnsure + 'static) -> Self {
        self.dirs = Box::new(dirs);
        self
    }

    /// Resolves a package reference into a launchable job.
    ///
    /// Runtime directories named by `VARDIR`, `TEMPDIR` and `LOGDIR` exist once
    /// this returns.
    pub fn resolve(&self, reference: &str) -> Result<JobSpec, ResolveError> {
        let package = PackageRef::parse(reference)?;
        let mut config = self.mode_layers(&package);

        let root = self.locator.resolve(&package, &self.invocation.cwd)?;
        let manifest = self.manifests.read(&root)?;
        let script = manifest
            .start_script()
            .ok_or_else(|| ResolveError::MissingStartScript(package.to_string()))?;

        let command = self.parser.parse(script)?;
        if command.exec.is_empty() {
            return Err(ResolveError::EmptyCommand(package.to_string()));
        }
        config.load(Layer::from(command.envs));

        let env = self.interpolate(&config, &package, &root)?;
        self.ensure_runtime_dirs(&env, &root)?;

        info!("Resolved '{package}' to '{}' in {:?}", command.exec, root);
        Ok(JobSpec {
            exec: command.exec,
            args: command.args,
            cwd: root,
            env,
        })
    }

    /// The interpolated environment a package would get from its configuration
    /// layers, without reading its manifest or touching the filesystem.
    pub fn environment(
        &self,
        reference: &str,
    ) -> Result<BTreeMap<String, String>, ResolveError> {
        let package = PackageRef::parse(reference)?;
        let config = self.mode_layers(&package);
        let root = self.locator.resolve(&package, &self.invocation.cwd)?;
        self.interpolate(&config, &package, &root)
    }

    fn mode_layers(&self, package: &PackageRef) -> LayeredConfig {
        let mut config = LayeredConfig::new();

        match package {
            PackageRef::Relative(_) => {
                // Data for a relative package lives beside it.
                let cwd = self.invocation.cwd.display().to_string();
                config.load(RUNTIME_DIR_KEYS.iter().map(|key| (*key, cwd.as_str())).collect());
                config.load(Layer::from(self.invocation.env.clone()));
                config.load(Layer::from_iter([("PATH", RELATIVE_PATH_TEMPLATE)]));
            }
            PackageRef::Global(name) => {
                config.load(Layer::graceful(&self.paths.system_defaults()));
                config.load(Layer::graceful(&self.paths.package_defaults(name)));
            }
        }

        debug!(
            "Loaded {} config layers for '{package}'",
            config.layer_count()
        );
        config
    }

    fn context(&self, package: &PackageRef, root: &Path) -> Context {
        Context {
            home: self.invocation.var("HOME").map(str::to_string),
            user: self.invocation.var("USER").map(str::to_string),
            root: root.display().to_string(),
            package: package.to_string(),
            path: self.invocation.var("PATH").map(str::to_string),
            hostname: self.invocation.hostname.clone(),
            tmpdir: self.invocation.tmpdir.display().to_string(),
        }
    }

    fn interpolate(
        &self,
        config: &LayeredConfig,
        package: &PackageRef,
        root: &Path,
    ) -> Result<BTreeMap<String, String>, ResolveError> {
        let interp = Interpolator::new(self.context(package, root), self.policy);
        config
            .keys()
            .into_iter()
            .filter_map(|key| config.get(key).map(|raw| (key, raw)))
            .map(|(key, raw)| {
                interp
                    .try_expand(raw)
                    .map(|value| (key.to_string(), value))
                    .map_err(|token| ResolveError::UnresolvedToken {
                        key: key.to_string(),
                        token,
                    })
            })
            .collect()
    }

    fn ensure_runtime_dirs(
        &self,
        env: &BTreeMap<String, String>,
        root: &Path,
    ) -> Result<(), ResolveError> {
        for key in RUNTIME_DIR_KEYS {
            if let Some(dir) = runtime_dir(env, root, key) {
                debug!("Ensuring {key} directory {:?}", dir);
                self.dirs
                    .ensure(&dir)
                    .map_err(|source| ResolveError::DirectoryCreation { path: dir, source })?;
            }
        }
        Ok(())
    }
}

/// The directory a runtime variable points at, relative values taken from the
/// package root. Unset and empty values yield `None`.
pub fn runtime_dir(env: &BTreeMap<String, String>, root: &Path, key: &str) -> Option<PathBuf> {
    env.get(key)
        .filter(|value| !value.is_empty())
        .map(|value| root.join(value))
}
