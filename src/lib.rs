//! npkg resolves packages into fully specified jobs (command, arguments,
//! working directory, environment) and either runs them in the foreground or
//! hands them to a supervisor over a small HTTP job-control protocol.

/// CLI interface.
pub mod cli;

/// HTTP client for the supervisor.
pub mod client;

/// Settings, well-known paths and defaults files.
pub mod config;

/// Shared constants.
pub mod constants;

/// Error handling.
pub mod error;

/// Identity hashing for package references.
pub mod hash;

/// Global installs.
pub mod install;

/// `%{token}` interpolation.
pub mod interpolate;

/// Job specifications and run requests.
pub mod job;

/// Layered configuration.
pub mod layers;

/// Logs management.
pub mod logs;

/// Package references and resolver collaborators.
pub mod package;

/// Job resolution.
pub mod resolver;

/// Foreground execution.
pub mod runner;

/// Installed package listing.
pub mod show;
