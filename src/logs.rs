use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::constants::LOG_EXTENSION;

/// Log file for the job keyed `key`: `<log_dir>/<key>.log`.
pub fn log_path(log_dir: &Path, key: &str) -> PathBuf {
    log_dir.join(format!("{key}.{LOG_EXTENSION}"))
}

/// Writes the last `lines` lines of a job's log file to `out`.
///
/// # Arguments
/// * `path` - The log file.
/// * `lines` - The number of log lines to display.
/// * `out` - Destination for the lines.
///
/// # Returns
/// * `Ok(false)` if the log file does not exist, `Ok(true)` once printed.
pub fn show_log<W: Write>(path: &Path, lines: usize, out: &mut W) -> io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let mut reader = BufReader::new(File::open(path)?);
    // Sized by the file, not by `lines`, which comes straight from the user.
    let mut tail = VecDeque::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if lines == 0 {
            continue;
        }
        if tail.len() == lines {
            tail.pop_front();
        }
        let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        tail.push_back(String::from_utf8_lossy(line).into_owned());
    }

    for line in tail {
        writeln!(out, "{}", line)?;
    }

    Ok(true)
}
