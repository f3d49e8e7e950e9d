//! Constants and well-known values used across npkg.
//!
//! File names, wire paths and exit codes live here so the resolver, client and
//! binary agree on them.

use std::time::Duration;

// ============================================================================
// Supervisor Endpoint
// ============================================================================

/// Supervisor host used when `HOST` is unset.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Supervisor port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 1;

/// Environment variable overriding the supervisor host.
pub const HOST_ENV: &str = "HOST";

/// Environment variable overriding the supervisor port.
pub const PORT_ENV: &str = "PORT";

/// Any non-empty value turns on dry-run request printing.
pub const DEBUG_ENV: &str = "DEBUG";

/// `1`/`true` selects strict interpolation.
pub const STRICT_ENV: &str = "NPKG_STRICT";

/// Timeout for control requests that do not stream a body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing the TCP connection to the supervisor.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Wire Protocol
// ============================================================================

/// Path segment for single-job resources (`/job/<key>`).
pub const JOB_SEGMENT: &str = "job";

/// Path segment listing every job (`/jobs`).
pub const JOBS_SEGMENT: &str = "jobs";

/// Segment appended to a job path to attach to its output.
pub const STDIO_SEGMENT: &str = "stdio";

/// Chunk size used when relaying streamed job output.
pub const STREAM_BUFFER_SIZE: usize = 8192;

// ============================================================================
// Layout
// ============================================================================

/// Global modules live under `$HOME/<this>`.
pub const NODE_MODULES_DIR: &str = "lib/node_modules";

/// Defaults files live under `$HOME/<this>`.
pub const CONFIG_DIR: &str = "etc";

/// Name of both the system and per-package defaults file.
pub const DEFAULTS_FILE_NAME: &str = "defaults.json";

/// Package manager settings, relative to `$HOME`.
pub const NPMRC_FILE_NAME: &str = ".npmrc";

/// Manifest file name inside a package directory.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Extension of per-job log files.
pub const LOG_EXTENSION: &str = "log";

/// Package manager binary used by `npkg install`.
pub const PACKAGE_MANAGER: &str = "npm";

// ============================================================================
// Job Environment
// ============================================================================

/// Runtime directory variables every launched job can rely on.
pub const RUNTIME_DIR_KEYS: [&str; 3] = ["VARDIR", "TEMPDIR", "LOGDIR"];

/// `PATH` given to relative packages so dependency binaries are reachable.
pub const RELATIVE_PATH_TEMPLATE: &str = "%{root}/node_modules/.bin : %{path}";

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit code used when a directly run child dies from a signal.
pub const SIGNAL_EXIT_CODE: i32 = 51;

/// Default number of log lines printed by `npkg logs`.
pub const DEFAULT_LOG_LINES: usize = 50;
