//! Job specifications and their supervisor wire form.
use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A fully resolved, ready-to-execute description of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Executable to launch. Never empty.
    pub exec: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory: the resolved package path.
    pub cwd: PathBuf,
    /// Complete, interpolated environment.
    pub env: BTreeMap<String, String>,
}

/// Where a supervised job's output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioSpec {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl StdioSpec {
    /// Sends both streams to the same file.
    pub fn combined(path: PathBuf) -> Self {
        Self {
            stdout: path.clone(),
            stderr: path,
        }
    }
}

/// Body of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(flatten)]
    pub job: JobSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdio: Option<StdioSpec>,
}

impl RunRequest {
    pub fn new(job: JobSpec, stdio: Option<StdioSpec>) -> Self {
        Self { job, stdio }
    }
}

/// Flags passed alongside a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
pub enum RunOption {
    /// Stream the job's output back in the start response.
    #[strum(serialize = "stdio=stream")]
    StreamStdio,
}

impl RunOption {
    /// Splits the option into a query pair.
    pub fn query_pair(&self) -> (&'static str, &'static str) {
        match self {
            RunOption::StreamStdio => ("stdio", "stream"),
        }
    }
}
