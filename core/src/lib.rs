//! Client core for the personal todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` supplied by the
//! caller performs the round-trip, which keeps every piece of state logic here
//! deterministic and testable.
//!
//! # Design
//! - `TodoClient` is stateless, it holds only `base_url`, and splits every
//!   endpoint into `build_*` and `parse_*`.
//! - `Session` is the explicit authentication context: it attaches the bearer
//!   credential and drops it when the server rejects it.
//! - `Synchronizer` owns the local mirror of the todo collection and applies
//!   `Command` values to it, reconciling from each server response.
//! - `view::project` is the pure filtered/sorted projection shown to users.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod account;
pub mod client;
pub mod error;
pub mod http;
pub mod session;
pub mod sync;
pub mod transport;
pub mod types;
pub mod view;

pub use account::{PasswordChange, ProfileUpdate, RegisterForm, User};
pub use client::TodoClient;
pub use error::{ApiError, RequestError, SyncError, TransportError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::Session;
pub use sync::{Command, Synchronizer, Ticket};
pub use transport::Transport;
pub use types::{NewTodo, Todo, TodoPatch, TodoRequest};
pub use view::{Counts, Filter};
