//! Error handling for npkg.
use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration layer could not be read.
///
/// This is a soft failure: callers collapse it into an empty layer with
/// [`crate::layers::Layer::graceful`] and resolution carries on.
#[derive(Debug, Error)]
pub enum LayerLoadError {
    /// The file could not be read.
    #[error("failed to read config layer {path:?}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid JSON.
    #[error("failed to parse config layer {path:?}: {source}")]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: serde_json::Error,
    },

    /// The file held valid JSON that is not an object.
    #[error("config layer {0:?} is not a JSON object")]
    NotAnObject(PathBuf),
}

/// Errors raised while turning a package reference into a job specification.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No package reference was supplied.
    #[error("no package given (try: npkg show)")]
    EmptyReference,

    /// The package could not be located on disk.
    #[error("package '{package}' not found at {path:?}")]
    PackageNotFound {
        /// The package reference as given.
        package: String,
        /// Where it was expected.
        path: PathBuf,
    },

    /// The package manifest is missing or malformed.
    #[error("failed to read manifest {path:?}: {reason}")]
    Manifest {
        /// Manifest file path.
        path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// The manifest has no `scripts.start` entry.
    #[error("package '{0}' has no start script")]
    MissingStartScript(String),

    /// The start script holds nothing but variable assignments.
    #[error("start script for '{0}' does not name a command")]
    EmptyCommand(String),

    /// The start script opens a quote it never closes.
    #[error("start script has an unterminated quote: {0}")]
    UnterminatedQuote(String),

    /// Strict interpolation found a token with no value.
    #[error("unresolved token '%{{{token}}}' in '{key}'")]
    UnresolvedToken {
        /// Config key whose value held the token.
        key: String,
        /// Token name.
        token: String,
    },

    /// A runtime directory could not be created.
    #[error("failed to create directory {path:?}: {source}")]
    DirectoryCreation {
        /// Directory that was being created.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while talking to the supervisor.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The configured host/port do not form a usable URL.
    #[error("invalid supervisor endpoint '{0}'")]
    InvalidEndpoint(String),

    /// The request never got a response.
    #[error("supervisor request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The supervisor answered with a status we do not understand.
    #[error("supervisor returned unexpected status {status} for {operation}")]
    UnexpectedStatus {
        /// Operation that was attempted.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// The supervisor has no job under the given key.
    #[error("no job '{0}' known to the supervisor")]
    JobNotFound(String),

    /// A request or response body could not be (de)serialised.
    #[error("failed to serialise control message: {0}")]
    Serde(#[from] serde_json::Error),

    /// Local I/O failed while relaying a stream.
    #[error("control stream I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the direct execution runner.
#[derive(Debug, Error)]
pub enum RunError {
    /// The child process could not be started.
    #[error("failed to spawn '{exec}': {source}")]
    Spawn {
        /// Executable that was spawned.
        exec: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("failed waiting on '{exec}': {source}")]
    Wait {
        /// Executable that was spawned.
        exec: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by program settings and persisted defaults files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `HOME` is not set.
    #[error("HOME environment variable not set")]
    MissingHome,

    /// `PORT` is not a valid port number.
    #[error("invalid supervisor port '{0}'")]
    InvalidPort(String),

    /// Reading or writing a defaults file failed.
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A defaults file could not be serialised.
    #[error("failed to serialise config file: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors raised while installing a package.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The package manager ran but reported failure.
    #[error("package manager exited with status {0:?}")]
    PackageManager(Option<i32>),

    /// The package manager could not be launched.
    #[error("failed to launch package manager: {0}")]
    Io(#[from] std::io::Error),

    /// The installed package could not be inspected.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The package defaults file could not be written.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
