//! Loopback HTTP server and fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use autoinstaller::{InstallError, LogLevel, Logger, ProcessRunner};
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Keep reqwest from routing loopback requests through a configured proxy.
pub fn bypass_proxy() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    std::env::set_var("no_proxy", "127.0.0.1,localhost");
}

/// Serve each canned response to one connection, in order.
pub async fn serve(responses: Vec<Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(&response).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });
    addr
}

pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

pub fn not_found_response() -> Vec<u8> {
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found".to_vec()
}

#[derive(Default)]
pub struct MemoryLogger {
    pub lines: Mutex<Vec<(LogLevel, String)>>,
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

impl MemoryLogger {
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

/// Records invocations and fails the listed programs with an exit code.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<(String, String, bool)>>,
    pub failing: Vec<(String, i32)>,
}

impl RecordingRunner {
    pub fn failing(program: &str, code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: vec![(program.to_string(), code)],
        }
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _, _)| p.clone()).collect()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(
        &self,
        program: &str,
        args: &str,
        requires_admin: bool,
        _cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_string(), requires_admin));
        match self.failing.iter().find(|(p, _)| p == program) {
            Some((_, code)) => Err(InstallError::ProcessExit {
                program: program.to_string(),
                exit_code: Some(*code),
                fix: "Check the installer log".to_string(),
            }),
            None => Ok(()),
        }
    }
}
