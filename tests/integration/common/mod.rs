#![allow(dead_code)]

use std::{
    fs,
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
};

use assert_cmd::Command;

/// One request as the mock supervisor saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query, e.g. `/job/abc?stdio=stream`.
    pub target: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

/// A supervisor stand-in that answers each connection with the next canned
/// reply, then closes it.
pub struct MockSupervisor {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockSupervisor {
    pub fn start(replies: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock supervisor");
        let port = listener.local_addr().expect("no local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let replies: Vec<(u16, String)> = replies
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for (status, body) in replies {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                serve(stream, status, &body, &recorded);
            }
        });

        Self { port, requests }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("poisoned").clone()
    }

    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected one request, got {requests:?}");
        requests[0].clone()
    }
}

fn serve(stream: TcpStream, status: u16, body: &str, recorded: &Mutex<Vec<RecordedRequest>>) {
    let mut reader = BufReader::new(stream.try_clone().expect("failed to clone stream"));

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap_or(0) == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut request_body = vec![0u8; content_length];
    let _ = reader.read_exact(&mut request_body);

    recorded.lock().expect("poisoned").push(RecordedRequest {
        method,
        target,
        body: String::from_utf8_lossy(&request_body).into_owned(),
    });

    let mut stream = stream;
    let _ = write!(
        stream,
        "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.flush();
}

/// The npkg binary with a clean environment rooted at `home`.
pub fn npkg(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("npkg"));
    cmd.env("HOME", home);
    for var in [
        "HOST",
        "PORT",
        "DEBUG",
        "NPKG_STRICT",
        "RUST_LOG",
        "LOGDIR",
        "VARDIR",
        "TEMPDIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Writes `package.json` into `dir`, creating it.
pub fn write_package(dir: &Path, manifest: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("failed to create package dir");
    fs::write(dir.join("package.json"), manifest).expect("failed to write manifest");
    dir.to_path_buf()
}

/// Installs a package fixture under `home` as if it had been installed globally.
pub fn install_global(home: &Path, name: &str, manifest: &str) -> PathBuf {
    write_package(&home.join("lib/node_modules").join(name), manifest)
}

/// Writes a defaults file (system defaults when `name` is `None`).
pub fn write_defaults(home: &Path, name: Option<&str>, content: &str) {
    let path = match name {
        Some(name) => home.join("etc").join(name).join("defaults.json"),
        None => home.join("etc/defaults.json"),
    };
    fs::create_dir_all(path.parent().expect("defaults path has a parent"))
        .expect("failed to create config dir");
    fs::write(path, content).expect("failed to write defaults");
}
