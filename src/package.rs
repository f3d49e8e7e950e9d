//! Package references and the collaborators the resolver leans on: manifest
//! reading, start-script tokenizing, path resolution and directory creation.
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{config::Paths, constants::MANIFEST_FILE_NAME, error::ResolveError};

/// A user supplied package identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageRef {
    /// A path, starting with `.` or `/`, resolved against the current directory.
    Relative(String),
    /// A bare name, resolved under the install root.
    Global(String),
}

impl PackageRef {
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        if reference.is_empty() {
            return Err(ResolveError::EmptyReference);
        }
        if reference.starts_with('.') || reference.starts_with('/') {
            Ok(Self::Relative(reference.to_string()))
        } else {
            Ok(Self::Global(reference.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Relative(r) | Self::Global(r) => r,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative(_))
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of `package.json` npkg cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bin: Option<Value>,
    #[serde(default)]
    pub scripts: Option<Scripts>,
    /// Variables the package expects to be configured.
    #[serde(default)]
    pub environment: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scripts {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub test: Option<String>,
}

impl Manifest {
    /// The non-empty start script, if any.
    pub fn start_script(&self) -> Option<&str> {
        self.scripts
            .as_ref()
            .and_then(|s| s.start.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn has_start(&self) -> bool {
        self.start_script().is_some()
    }

    pub fn has_test(&self) -> bool {
        self.scripts
            .as_ref()
            .and_then(|s| s.test.as_deref())
            .is_some_and(|s| !s.trim().is_empty())
    }

    pub fn has_bin(&self) -> bool {
        match &self.bin {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// Names of the variables declared under `environment`.
    pub fn environment_keys(&self) -> Vec<&str> {
        self.environment
            .as_ref()
            .map(|env| env.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// A start script split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub exec: String,
    pub args: Vec<String>,
    /// Leading `NAME=value` assignments.
    pub envs: BTreeMap<String, String>,
}

/// Reads a package's manifest.
pub trait ManifestReader {
    fn read(&self, package_dir: &Path) -> Result<Manifest, ResolveError>;
}

/// Splits a start script into executable, arguments and assignments.
pub trait CommandParser {
    fn parse(&self, script: &str) -> Result<ParsedCommand, ResolveError>;
}

/// Locates a package on disk.
pub trait PathResolver {
    fn resolve(&self, package: &PackageRef, cwd: &Path) -> Result<PathBuf, ResolveError>;
}

/// Creates a directory and its missing ancestors.
pub trait DirEnsure {
    fn ensure(&self, path: &Path) -> std::io::Result<()>;
}

/// Reads `package.json` from the package directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifestReader;

impl ManifestReader for JsonManifestReader {
    fn read(&self, package_dir: &Path) -> Result<Manifest, ResolveError> {
        let path = package_dir.join(MANIFEST_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|err| ResolveError::Manifest {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|err| ResolveError::Manifest {
            path,
            reason: err.to_string(),
        })
    }
}

/// Shell-like word splitting with single quotes, double quotes and backslash
/// escapes. Leading `NAME=value` words become environment assignments, as long
/// as the `NAME=` part is unquoted. An unclosed quote is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandParser;

impl CommandParser for ShellCommandParser {
    fn parse(&self, script: &str) -> Result<ParsedCommand, ResolveError> {
        let mut words = split_words(script)?.into_iter().peekable();
        let mut envs = BTreeMap::new();

        while let Some(word) = words.peek() {
            match word.assignment() {
                Some((key, value)) => {
                    envs.insert(key.to_string(), value.to_string());
                    words.next();
                }
                None => break,
            }
        }

        let exec = words.next().map(|word| word.text).unwrap_or_default();
        Ok(ParsedCommand {
            exec,
            args: words.map(|word| word.text).collect(),
            envs,
        })
    }
}

/// One word of a start script.
#[derive(Debug, Default)]
struct Word {
    text: String,
    /// Byte length of the leading part written without quotes or escapes.
    bare: usize,
    quoted: bool,
}

impl Word {
    fn push(&mut self, c: char) {
        self.text.push(c);
        if !self.quoted {
            self.bare = self.text.len();
        }
    }

    fn push_quoted(&mut self, c: char) {
        self.quoted = true;
        self.text.push(c);
    }

    fn assignment(&self) -> Option<(&str, &str)> {
        let (key, value) = self.text.split_once('=')?;
        if key.len() >= self.bare {
            return None;
        }
        let mut chars = key.chars();
        let first = chars.next()?;
        if (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            Some((key, value))
        } else {
            None
        }
    }
}

fn split_words(script: &str) -> Result<Vec<Word>, ResolveError> {
    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut words = Vec::new();
    let mut current = Word::default();
    let mut in_word = false;
    let mut quote = Quote::None;
    let mut chars = script.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push_quoted(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\' | '$' | '`')) => current.push_quoted(next),
                    Some(next) => {
                        current.push_quoted('\\');
                        current.push_quoted(next);
                    }
                    None => current.push_quoted('\\'),
                },
                _ => current.push_quoted(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    current.quoted = true;
                    in_word = true;
                }
                '"' => {
                    quote = Quote::Double;
                    current.quoted = true;
                    in_word = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push_quoted(next);
                    }
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }

    if quote != Quote::None {
        return Err(ResolveError::UnterminatedQuote(script.to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Resolves relative references against the current directory and global
/// names under the install root.
#[derive(Debug, Clone)]
pub struct ModulePathResolver {
    paths: Paths,
}

impl ModulePathResolver {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }
}

impl PathResolver for ModulePathResolver {
    fn resolve(&self, package: &PackageRef, cwd: &Path) -> Result<PathBuf, ResolveError> {
        let candidate = match package {
            PackageRef::Relative(reference) => cwd.join(reference),
            PackageRef::Global(name) => self.paths.module_dir(name),
        };

        match candidate.canonicalize() {
            Ok(path) if path.is_dir() => Ok(path),
            _ => Err(ResolveError::PackageNotFound {
                package: package.to_string(),
                path: candidate,
            }),
        }
    }
}

/// `fs::create_dir_all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDirAll;

impl DirEnsure for CreateDirAll {
    fn ensure(&self, path: &Path) -> std::io::Result<()> {
        fs::create_dir_all(path)
    }
}
