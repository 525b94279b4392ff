//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crserver_proxy::config::ProxyConfig;
use crserver_proxy::http::HttpServer;
use crserver_proxy::lifecycle::Shutdown;
use crserver_proxy::registry::{BackendRegistry, Snapshot};

/// A request as seen by the spy backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned response of the spy backend.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

impl CannedResponse {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status_line: "200 OK",
            headers: vec![("Content-Type", "application/xml")],
            body,
        }
    }
}

/// Backend that records every request and answers with a fixed response.
#[derive(Clone)]
pub struct SpyBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl SpyBackend {
    pub async fn start(response: CannedResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    // Recorded before replying, so callers see it once they have the response.
                    if let Some(request) = read_request(&mut socket).await {
                        recorded.lock().unwrap().push(request);
                        reply(socket, &response).await;
                    }
                });
            }
        });

        Self { addr, requests }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn reply(mut socket: TcpStream, response: &CannedResponse) {
    let mut text = format!("HTTP/1.1 {}\r\n", response.status_line);
    for (name, value) in &response.headers {
        text.push_str(&format!("{}: {}\r\n", name, value));
    }
    text.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    ));
    let _ = socket.write_all(text.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Backend that reads each request, writes `partial` (possibly nothing)
/// and then holds the connection open without finishing the response.
pub async fn start_stalling_backend(partial: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_some() {
                    let _ = socket.write_all(partial.as_bytes()).await;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                drop(socket);
            });
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// A running proxy bound to an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub registry: Arc<BackendRegistry>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy with `repository_url` as base and `snapshot` installed.
pub async fn start_proxy(repository_url: &str, commit_regexp: &str, snapshot: Snapshot) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.repository.url = repository_url.to_string();
    config.repository.commit_regexp = commit_regexp.to_string();
    start_proxy_with(config, snapshot).await
}

/// Start a proxy from a complete `config` with `snapshot` installed.
pub async fn start_proxy_with(config: ProxyConfig, snapshot: Snapshot) -> TestProxy {
    let registry = Arc::new(BackendRegistry::empty());
    registry.replace(snapshot);

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, registry.clone()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        registry,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// A call envelope as sent by the 1C client.
pub fn call_body(name: &str, version: &str, comment: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<crs:call xmlns:crs="http://v8.1c.ru/8.2/crs" alias="dev" name="{name}" version="{version}">
    <crs:params>
        <crs:comment>{comment}</crs:comment>
    </crs:params>
</crs:call>"#
    )
}

/// Decode the base64 payload of a `crs:call_exception` document.
pub fn fault_message(document: &str) -> String {
    let start = document.find("\">").expect("no exception element") + 2;
    let end = document.find("</crs:call_exception>").expect("no closing tag");
    let decoded = STANDARD.decode(&document[start..end]).expect("payload is not base64");
    String::from_utf8(decoded).unwrap()
}
