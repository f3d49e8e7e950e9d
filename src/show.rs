//! Listing of globally installed packages.
use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use tracing::debug;

use crate::package::ManifestReader;

const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[36m";
const GREEN_BRIGHT: &str = "\x1b[92m";
const RESET: &str = "\x1b[0m";

/// Which packages `npkg show` prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowFilter {
    /// A table of every package.
    #[default]
    All,
    /// Names of packages with a start script.
    Startable,
    /// Names of packages exposing a binary.
    WithBin,
}

/// What an installed package offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub has_bin: bool,
    pub has_start: bool,
    pub has_test: bool,
}

/// Inspects every package under `node_modules`, sorted by name.
///
/// Scoped packages (`@scope/name`) are listed by their full name. Packages
/// whose manifest cannot be read are listed with every capability off.
pub fn installed_packages(
    node_modules: &Path,
    manifests: &dyn ManifestReader,
) -> io::Result<Vec<PackageInfo>> {
    let mut packages = Vec::new();

    for (name, dir) in package_dirs(node_modules)? {
        let info = match manifests.read(&dir) {
            Ok(manifest) => PackageInfo {
                name,
                has_bin: manifest.has_bin(),
                has_start: manifest.has_start(),
                has_test: manifest.has_test(),
            },
            Err(err) => {
                debug!("Unreadable manifest for '{name}': {err}");
                PackageInfo {
                    name,
                    has_bin: false,
                    has_start: false,
                    has_test: false,
                }
            }
        };
        packages.push(info);
    }

    packages.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(packages)
}

fn package_dirs(node_modules: &Path) -> io::Result<Vec<(String, std::path::PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(node_modules)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !path.is_dir() {
            continue;
        }

        if name.starts_with('@') {
            for scoped in fs::read_dir(&path)? {
                let scoped = scoped?;
                if scoped.path().is_dir() {
                    let child = scoped.file_name().to_string_lossy().into_owned();
                    dirs.push((format!("{name}/{child}"), scoped.path()));
                }
            }
        } else {
            dirs.push((name, path));
        }
    }
    Ok(dirs)
}

fn yes_no(flag: bool) -> String {
    if flag {
        format!("{CYAN}Yes{RESET}")
    } else {
        format!("{GREEN_BRIGHT}No{RESET} ")
    }
}

/// Prints packages according to `filter`.
pub fn render<W: Write>(
    packages: &[PackageInfo],
    filter: ShowFilter,
    out: &mut W,
) -> io::Result<()> {
    match filter {
        ShowFilter::All => {
            writeln!(
                out,
                "{BOLD}Package              Has bin     Can start   Has test{RESET}"
            )?;
            for pkg in packages {
                writeln!(
                    out,
                    "{:<20} {:<20} {:<20} {:<10}",
                    pkg.name,
                    yes_no(pkg.has_bin),
                    yes_no(pkg.has_start),
                    yes_no(pkg.has_test)
                )?;
            }
        }
        ShowFilter::Startable => {
            for pkg in packages.iter().filter(|p| p.has_start) {
                writeln!(out, "{}", pkg.name)?;
            }
        }
        ShowFilter::WithBin => {
            for pkg in packages.iter().filter(|p| p.has_bin) {
                writeln!(out, "{}", pkg.name)?;
            }
        }
    }
    Ok(())
}
