//! Purpose: Blocking HTTP transfer that feeds the response body into a `WriteSink`.
//! Exports: `HttpTransfer`, `TransferOptions`, `TransferReport`, `DEFAULT_USER_AGENT`.
//! Role: Thin seam over `ureq`; maps engine failures to `TransferCode`s.
//! Invariants: The sink is invoked sequentially, in arrival order, on the calling thread.
//! Invariants: A sink return value other than the chunk length aborts with `WriteError`.
//! Invariants: HTTP error statuses deliver their body unless `fail_on_http_error` is set.
use std::io::{self, Read};
use std::time::Duration;

use url::Url;

use crate::core::accumulator::WriteSink;
use crate::core::error::{Error, TransferCode};

pub const DEFAULT_USER_AGENT: &str = concat!("fetchtree/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_READ_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Clone, Debug)]
pub struct TransferOptions {
    pub timeout: Option<Duration>,
    pub user_agent: String,
    pub fail_on_http_error: bool,
    pub read_chunk_size: usize,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fail_on_http_error: false,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_fail_on_http_error(mut self, fail: bool) -> Self {
        self.fail_on_http_error = fail;
        self
    }

    /// Upper bound on the size of a single chunk handed to the sink.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransferReport {
    pub status: u16,
    pub bytes: u64,
    pub chunks: u64,
}

#[derive(Clone)]
pub struct HttpTransfer {
    agent: ureq::Agent,
    options: TransferOptions,
}

impl HttpTransfer {
    pub fn new(options: TransferOptions) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(&options.user_agent);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            options,
        }
    }

    /// Fetch `url` and push the body through `sink` until end of stream.
    pub fn perform<S>(&self, url: &str, sink: &mut S) -> Result<TransferReport, Error>
    where
        S: WriteSink + ?Sized,
    {
        let target = parse_target_url(url)?;
        tracing::debug!(url = %target, "starting transfer");

        let response = match self.agent.request("GET", target.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                if self.options.fail_on_http_error {
                    tracing::warn!(url = %target, status, "http error status");
                    return Err(Error::transfer(TransferCode::HttpReturnedError)
                        .with_message(format!("the requested URL returned error: {status}"))
                        .with_url(target.as_str()));
                }
                response
            }
            Err(ureq::Error::Transport(err)) => {
                let err = transport_error(err).with_url(target.as_str());
                tracing::warn!(url = %target, error = %err, "transfer failed");
                return Err(err);
            }
        };

        let status = response.status();
        let mut reader = response.into_reader();
        let mut buf = vec![0u8; self.options.read_chunk_size.max(1)];
        let mut report = TransferReport {
            status,
            bytes: 0,
            chunks: 0,
        };

        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    let code = if is_timeout(&err) {
                        TransferCode::OperationTimedOut
                    } else {
                        TransferCode::RecvError
                    };
                    tracing::warn!(url = %target, error = %err, "body read failed");
                    return Err(Error::transfer(code)
                        .with_message("failed to read response body")
                        .with_url(target.as_str())
                        .with_source(err));
                }
            };

            let accepted = sink.on_chunk(&buf[..read]);
            if accepted != read {
                tracing::warn!(url = %target, read, accepted, "sink refused chunk");
                return Err(Error::transfer(TransferCode::WriteError)
                    .with_message(format!(
                        "failure writing output to destination, passed {read} returned {accepted}"
                    ))
                    .with_url(target.as_str()));
            }
            report.bytes += read as u64;
            report.chunks += 1;
            tracing::debug!(chunk = report.chunks, bytes = read, "delivered chunk");
        }

        tracing::info!(
            url = %target,
            status = report.status,
            bytes = report.bytes,
            chunks = report.chunks,
            "transfer complete"
        );
        Ok(report)
    }
}

fn parse_target_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw).map_err(|err| {
        Error::transfer(TransferCode::UrlMalformat)
            .with_message(format!("malformed url: {err}"))
            .with_url(raw)
            .with_source(err)
    })?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::transfer(TransferCode::UnsupportedProtocol)
                .with_message(format!("protocol \"{scheme}\" not supported"))
                .with_url(raw));
        }
    }
    Ok(url)
}

fn transport_error(err: ureq::Transport) -> Error {
    let code = match err.kind() {
        ureq::ErrorKind::InvalidUrl => TransferCode::UrlMalformat,
        ureq::ErrorKind::UnknownScheme => TransferCode::UnsupportedProtocol,
        ureq::ErrorKind::Dns => TransferCode::CouldNotResolveHost,
        ureq::ErrorKind::ConnectionFailed => TransferCode::CouldNotConnect,
        ureq::ErrorKind::TooManyRedirects => TransferCode::TooManyRedirects,
        ureq::ErrorKind::Io if transport_timed_out(&err) => TransferCode::OperationTimedOut,
        _ => TransferCode::RecvError,
    };
    Error::transfer(code)
        .with_message(err.to_string())
        .with_source(err)
}

fn transport_timed_out(err: &ureq::Transport) -> bool {
    std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(is_timeout)
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
