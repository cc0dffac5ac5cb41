//! Shared fixtures: a live mock server and a ureq-backed transport client.

#![allow(dead_code)]

use std::net::SocketAddr;

use remote_core::{Body, Client, HttpMethod, Request, Response, TransportError};
use serde::Deserialize;
use uuid::Uuid;

/// Client-side view of a blog post. Defined independently from the mock
/// server so schema drift shows up as a test failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

/// Start the mock server on a random port and return its address.
pub fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Executes requests with ureq.
///
/// Status-as-error is disabled so 4xx/5xx responses come back as data and
/// the core decides what they mean.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    fn send(&self, request: &Request) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let uri = request.uri();
        match request.method() {
            HttpMethod::Get => with_headers(self.agent.get(uri), request).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(uri), request).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(uri), request);
                match request.content() {
                    Some(content) => builder.send(content.as_ref()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(uri), request);
                match request.content() {
                    Some(content) => builder.send(content.as_ref()),
                    None => builder.send_empty(),
                }
            }
            other => panic!("method not used by these tests: {other}"),
        }
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &Request) -> ureq::RequestBuilder<B> {
    for header in request.headers() {
        for value in &header.values {
            builder = builder.header(header.name.as_str(), value.as_str());
        }
    }
    builder
}

impl Client for UreqClient {
    fn request(&self, request: &Request) -> Result<Response, TransportError> {
        let mut response = self
            .send(request)
            .map_err(|e| TransportError::with_source(format!("{} {}", request.method(), request.uri()), e))?;

        let status = response.status();
        let mut builder = Response::builder().status(status.as_u16());
        if let Some(reason) = status.canonical_reason() {
            builder = builder.reason(reason);
        }
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                builder = builder.header(name.as_str(), value);
            }
        }
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::with_source("failed to read response body", e))?;

        Ok(builder
            .content_length(bytes.len() as u64)
            .body(Body::from_bytes(bytes))
            .build())
    }
}
