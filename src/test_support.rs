//! In-process HTTP stand-ins for the hosted services.
//!
//! A `tiny_http` server answers a scripted list of responses on an ephemeral
//! port and records every request it saw.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: String,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self::bytes(status, body.as_bytes().to_vec(), "application/json")
    }

    pub fn bytes(status: u16, body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status,
            body,
            content_type: content_type.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

pub struct MockServer {
    pub url: String,
    rx: mpsc::Receiver<Recorded>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Wait for the server thread and return the requests in arrival order.
    pub fn requests(self) -> Vec<Recorded> {
        let _ = self.handle.join();
        self.rx.try_iter().collect()
    }
}

/// Serve `responses` in order, one per incoming request.
pub fn serve(responses: Vec<MockResponse>) -> MockServer {
    let server = Server::http("127.0.0.1:0").expect("bind mock server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("mock server has an IP address");
    let url = format!("http://{}", addr);
    let (tx, rx) = mpsc::channel();

    let handle = std::thread::spawn(move || {
        for scripted in responses {
            let mut request = match server.recv_timeout(Duration::from_secs(5)) {
                Ok(Some(r)) => r,
                _ => break,
            };

            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);
            let recorded = Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().to_string(), h.value.as_str().to_string()))
                    .collect(),
                body,
            };
            let _ = tx.send(recorded);

            let header = Header::from_bytes(&b"Content-Type"[..], scripted.content_type.as_bytes())
                .expect("valid header");
            let response = Response::from_data(scripted.body)
                .with_status_code(scripted.status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });

    MockServer { url, rx, handle }
}
