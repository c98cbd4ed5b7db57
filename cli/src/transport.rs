//! `Transport` backed by a blocking ureq agent.

use std::time::Duration;

use todo_core::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use ureq::typestate::WithBody;
use ureq::RequestBuilder;

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// 4xx/5xx come back as responses; only connection-level failures and the
    /// global timeout become `TransportError`.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            path,
            headers,
            body,
        } = request;

        let result = match method {
            HttpMethod::Get => with_headers(self.agent.get(&path), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&path), &headers).call(),
            HttpMethod::Post => send(with_headers(self.agent.post(&path), &headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(&path), &headers), body),
        };
        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::new(e.to_string()))?;
        Ok(HttpResponse::new(status, body))
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: RequestBuilder<WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
