// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Loopback HTTP server standing in for the detection backend in tests.
//!
//! Each connection carries one request. The handler sees the request index
//! and the recorded request, and returns a status and a JSON body.

use serde_json::Value;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path including any query string
    pub path: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    /// `"METHOD /path"`, for compact assertions.
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

pub struct FakeBackend {
    address: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    stop: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl FakeBackend {
    pub fn start<F>(mut handler: F) -> Self
    where
        F: FnMut(usize, &Recorded) -> (u16, Value) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        listener.set_nonblocking(true).expect("set nonblocking listener");
        let address = listener.local_addr().expect("local addr").to_string();

        let stop = Arc::new(AtomicBool::new(false));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop_flag = Arc::clone(&stop);
        let recorded = Arc::clone(&requests);

        let join_handle = thread::spawn(move || {
            let mut index = 0;
            while !stop_flag.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let Some(request) = read_request(&mut stream) else {
                            continue;
                        };
                        let (status, body) = handler(index, &request);
                        index += 1;
                        recorded.lock().expect("request log").push(request);
                        write_response(&mut stream, status, &body);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            address,
            requests,
            stop,
            join_handle: Some(join_handle),
        }
    }

    /// Base URL to hand to a `BackendClient`.
    pub fn url(&self) -> String {
        format!("http://{}/", self.address)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("request log").clone()
    }

    /// Wait until at least `count` requests have been answered.
    pub fn wait_for(&self, count: usize) -> Vec<Recorded> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let requests = self.requests();
            if requests.len() >= count || Instant::now() > deadline {
                return requests;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(&self.address);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Echo a timeline write back as the entry the server stored.
pub fn stored_entry(index: usize, request: &Recorded) -> Value {
    let body = request.json();
    serde_json::json!({
        "id": index + 1,
        "step_type": body["step_type"],
        "timestamp": "2025-03-01T10:00:00",
        "data": body["data"],
    })
}

fn find_header_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|window| window == b"\r\n\r\n")
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .filter(|line| line.to_ascii_lowercase().starts_with("content-length:"))
        .find_map(|line| line.split(':').nth(1)?.trim().parse().ok())
        .unwrap_or(0)
}

fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    stream.set_nonblocking(false).ok()?;
    stream.set_read_timeout(Some(Duration::from_secs(2))).ok()?;

    let mut bytes = Vec::new();
    let mut buf = [0_u8; 4096];
    let mut body_start = None;
    let mut length = 0;

    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => {
                bytes.extend_from_slice(&buf[..read]);
                if body_start.is_none() {
                    if let Some(pos) = find_header_end(&bytes) {
                        body_start = Some(pos + 4);
                        length = content_length(&String::from_utf8_lossy(&bytes[..pos]));
                    }
                }
                if let Some(start) = body_start {
                    if bytes.len() >= start + length {
                        break;
                    }
                }
            }
            Err(_) => break,
        }
    }

    let start = body_start?;
    if bytes.len() < start + length {
        return None;
    }
    let headers = String::from_utf8_lossy(&bytes[..start]).to_string();
    let mut request_line = headers.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let body = String::from_utf8_lossy(&bytes[start..start + length]).to_string();

    Some(Recorded { method, path, body })
}

fn write_response(stream: &mut TcpStream, status: u16, body: &Value) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let body = body.to_string();
    let payload = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(payload.as_bytes());
    let _ = stream.flush();
}
