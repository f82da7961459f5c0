//! Purpose: Loopback HTTP responder shared by integration tests.
//! Exports: `Responder`, `LoopbackServer`, `closed_port_url`, `FEED_JSON`.
//! Role: Serve canned responses over real TCP so transfers run end to end.
//! Invariants: Binds 127.0.0.1 on an ephemeral port; never touches external hosts.
//! Invariants: Serves a fixed number of connections, then the thread exits.
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const FEED_JSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {"route_name": "504", "vehicle_id": 101},
      "geometry": {"type": "Point", "coordinates": [-79.4, 43.7]}
    },
    {
      "type": "Feature",
      "properties": {"route_name": "29", "vehicle_id": 8420},
      "geometry": {"type": "Point", "coordinates": [-79.45, 43.66]}
    }
  ]
}"#;

#[derive(Clone, Debug)]
pub struct Responder {
    pub status: u16,
    pub body: Vec<u8>,
    /// Body is written in pieces of this size with a flush after each.
    pub piece_size: usize,
    /// Hold the connection open without answering.
    pub stall: Option<Duration>,
}

impl Responder {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            piece_size: usize::MAX,
            stall: None,
        }
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            ..Self::ok(body)
        }
    }

    pub fn stalled(duration: Duration) -> Self {
        Self {
            stall: Some(duration),
            ..Self::ok(Vec::new())
        }
    }

    pub fn in_pieces(mut self, piece_size: usize) -> Self {
        self.piece_size = piece_size.max(1);
        self
    }
}

pub struct LoopbackServer {
    url: String,
    handle: Option<JoinHandle<()>>,
}

impl LoopbackServer {
    /// Serve `responder` for `connections` requests.
    pub fn start(responder: Responder, connections: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let Ok(stream) = stream else { continue };
                let _ = serve_one(stream, &responder);
            }
        });
        Self {
            url: format!("http://{addr}/feed"),
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the server thread after all expected connections were made.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_one(mut stream: TcpStream, responder: &Responder) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    if let Some(stall) = responder.stall {
        thread::sleep(stall);
        return Ok(());
    }

    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        responder.status,
        reason(responder.status),
        responder.body.len()
    )?;
    for piece in responder.body.chunks(responder.piece_size.min(responder.body.len().max(1))) {
        stream.write_all(piece)?;
        stream.flush()?;
    }
    stream.flush()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// URL pointing at a loopback port that nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/feed")
}
