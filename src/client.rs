//! HTTP control client for the supervisor.
use std::{
    collections::BTreeMap,
    fmt,
    io::{self, Read, Write},
    time::Duration,
};

use reqwest::{
    Method, StatusCode, Url,
    blocking::{Client, RequestBuilder, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    constants::{
        CONNECT_TIMEOUT, JOB_SEGMENT, JOBS_SEGMENT, REQUEST_TIMEOUT, STDIO_SEGMENT,
        STREAM_BUFFER_SIZE,
    },
    error::ControlError,
    job::{RunOption, RunRequest},
};

/// How the supervisor answered a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// `201`: the job was accepted and is running.
    Started,
    /// `400`: the supervisor refused the job.
    Rejected,
    /// Any other status. Never treated as success.
    Unknown(u16),
    /// Nothing was sent.
    DryRun,
}

impl StartOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::CREATED => Self::Started,
            StatusCode::BAD_REQUEST => Self::Rejected,
            other => Self::Unknown(other.as_u16()),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("Started Service"),
            Self::Rejected => f.write_str("Failed to Start Service"),
            Self::Unknown(_) => f.write_str("Unknown Response"),
            Self::DryRun => f.write_str("Dry Run"),
        }
    }
}

/// One row of the supervisor's job table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub respawn: Option<u64>,
}

/// Output relayed from the supervisor. Empty when nothing was sent.
pub struct JobStream {
    inner: Option<Response>,
}

impl JobStream {
    fn live(response: Response) -> Self {
        Self {
            inner: Some(response),
        }
    }

    fn empty() -> Self {
        Self { inner: None }
    }

    /// Copies the stream into `out` until the supervisor closes it.
    pub fn pipe_to<W: Write>(self, out: &mut W) -> Result<u64, ControlError> {
        Ok(pipe_stream(self, out)?)
    }
}

impl Read for JobStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(response) => response.read(buf),
            None => Ok(0),
        }
    }
}

/// Result of a start request: the outcome plus whatever body followed it.
pub struct StartResponse {
    pub outcome: StartOutcome,
    pub body: JobStream,
}

/// Talks to a supervisor at a fixed endpoint, one request at a time.
pub struct ServiceClient {
    http: Client,
    base: Url,
    dry_run: bool,
}

impl ServiceClient {
    pub fn new(endpoint: &str) -> Result<Self, ControlError> {
        let base = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ControlError::InvalidEndpoint(endpoint.to_string()))?;

        // Streamed bodies stay open as long as the job writes output.
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Option::<Duration>::None)
            .build()?;

        Ok(Self {
            http,
            base,
            dry_run: false,
        })
    }

    /// Print requests instead of sending them.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// Submits a job under `key`.
    pub fn start(
        &self,
        key: &str,
        request: &RunRequest,
        options: &[RunOption],
    ) -> Result<StartResponse, ControlError> {
        let mut url = self.url(&[JOB_SEGMENT, key]);
        if !options.is_empty() {
            let mut query = url.query_pairs_mut();
            for option in options {
                let (name, value) = option.query_pair();
                query.append_pair(name, value);
            }
        }

        if self.dry_run {
            self.print_request(Method::POST, &url, Some(&serde_json::to_value(request)?));
            return Ok(StartResponse {
                outcome: StartOutcome::DryRun,
                body: JobStream::empty(),
            });
        }

        let mut builder = self.http.post(url).json(request);
        if !options.contains(&RunOption::StreamStdio) {
            builder = builder.timeout(REQUEST_TIMEOUT);
        }
        let response = self.send("start", builder)?;
        let outcome = StartOutcome::from_status(response.status());
        info!("Start of '{key}' answered {}", response.status());

        Ok(StartResponse {
            outcome,
            body: JobStream::live(response),
        })
    }

    /// Asks the supervisor to stop the job under `key`.
    pub fn stop(&self, key: &str) -> Result<(), ControlError> {
        let url = self.url(&[JOB_SEGMENT, key]);
        if self.dry_run {
            self.print_request(Method::DELETE, &url, None);
            return Ok(());
        }

        let response = self.send("stop", self.http.delete(url).timeout(REQUEST_TIMEOUT))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ControlError::JobNotFound(key.to_string())),
            status => Err(unexpected("stop", status)),
        }
    }

    /// Every job the supervisor knows about.
    pub fn list(&self) -> Result<BTreeMap<String, JobSummary>, ControlError> {
        let url = self.url(&[JOBS_SEGMENT]);
        if self.dry_run {
            self.print_request(Method::GET, &url, None);
            return Ok(BTreeMap::new());
        }

        let response = self.send("list", self.http.get(url).timeout(REQUEST_TIMEOUT))?;
        match response.status() {
            status if status.is_success() => decode(response),
            status => Err(unexpected("list", status)),
        }
    }

    /// Full state of one job.
    pub fn status(&self, key: &str) -> Result<Value, ControlError> {
        let url = self.url(&[JOB_SEGMENT, key]);
        if self.dry_run {
            self.print_request(Method::GET, &url, None);
            return Ok(Value::Null);
        }

        let response = self.send("status", self.http.get(url).timeout(REQUEST_TIMEOUT))?;
        match response.status() {
            status if status.is_success() => decode(response),
            StatusCode::NOT_FOUND => Err(ControlError::JobNotFound(key.to_string())),
            status => Err(unexpected("status", status)),
        }
    }

    /// Opens a live tail of a job's output. Dropping the stream detaches
    /// without affecting the job.
    pub fn attach(&self, key: &str) -> Result<JobStream, ControlError> {
        let url = self.url(&[JOB_SEGMENT, key, STDIO_SEGMENT]);
        if self.dry_run {
            self.print_request(Method::GET, &url, None);
            return Ok(JobStream::empty());
        }

        let response = self.send("attach", self.http.get(url))?;
        match response.status() {
            status if status.is_success() => Ok(JobStream::live(response)),
            StatusCode::NOT_FOUND => Err(ControlError::JobNotFound(key.to_string())),
            status => Err(unexpected("attach", status)),
        }
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response, ControlError> {
        debug!("Sending {operation} request to {}", self.base);
        Ok(builder.send()?)
    }

    fn print_request(&self, method: Method, url: &Url, body: Option<&Value>) {
        println!("----> HTTP Request <----");
        println!("{method} {url}");
        if let Some(body) = body {
            match serde_json::to_string_pretty(body) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{body}"),
            }
        }
    }
}

fn unexpected(operation: &'static str, status: StatusCode) -> ControlError {
    ControlError::UnexpectedStatus {
        operation,
        status: status.as_u16(),
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ControlError> {
    let bytes = response.bytes()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Relays `reader` into `writer` chunk by chunk, flushing as it goes.
///
/// A closed writer (broken pipe) ends the relay quietly; nothing is reported
/// back upstream.
pub fn pipe_stream<R: Read, W: Write>(mut reader: R, writer: &mut W) -> io::Result<u64> {
    let mut buf = vec![0u8; STREAM_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        match writer.write_all(&buf[..n]).and_then(|_| writer.flush()) {
            Ok(()) => total += n as u64,
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!("Output closed after {total} bytes; detaching");
                return Ok(total);
            }
            Err(err) => return Err(err),
        }
    }
}
