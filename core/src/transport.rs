//! The I/O seam.
//!
//! Everything else in the crate is plain data in, plain data out. A
//! `Transport` is handed a fully built `HttpRequest` and returns whatever
//! came back, leaving status interpretation to `TodoClient::parse_*`.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations must return non-2xx responses as `Ok`; `Err` is reserved
/// for the case where no response was received at all.
pub trait Transport {
    fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::*;

    /// Replays canned outcomes in order and records every request it saw.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        outcomes: VecDeque<Result<HttpResponse, TransportError>>,
        pub(crate) requests: Vec<HttpRequest>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(mut self, status: u16, body: &str) -> Self {
            self.outcomes.push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        pub(crate) fn fail(mut self, message: &str) -> Self {
            self.outcomes.push_back(Err(TransportError::new(message)));
            self
        }

        pub(crate) fn last_body(&self) -> serde_json::Value {
            let body = self
                .requests
                .last()
                .and_then(|r| r.body.as_deref())
                .expect("no request body recorded");
            serde_json::from_str(body).unwrap()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&mut self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.push(request);
            self.outcomes
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no scripted response left")))
        }
    }
}
