//! Local mirror of the remote todo collection.
//!
//! # Design
//! `Synchronizer` owns the collection and applies explicit `Command` values
//! to it. Every operation has two halves, following the build/parse split of
//! `TodoClient`:
//! - `begin*` validates, looks up the target item and returns the request to
//!   send together with a `Ticket` describing what to do with the answer.
//! - `complete` consumes the ticket and the transport outcome and reconciles
//!   the collection from the server's response.
//!
//! The collection only changes inside `complete`, and only by a whole
//! replace, an append, a single-element replace or a single-element remove.
//! Create and replace reconcile by the id the server returns, so no two
//! entries ever share an id.
//! When several tickets are outstanding their completions are applied in the
//! order they arrive, so the last response wins. `dispatch` and `load` run one
//! operation to completion before returning.
//!
//! Failures never escape: they are logged and turned into the single
//! user-facing `SyncError` slot, which the next success clears.

use tracing::{debug, warn};

use crate::client::TodoClient;
use crate::error::{ApiError, RequestError, SyncError, TransportError, ValidationError};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{NewTodo, Todo, TodoPatch, TodoRequest};
use crate::view::{self, Counts, Filter};

/// A user action against the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(NewTodo),
    Update { id: i64, patch: TodoPatch },
    /// `previous_completed` is the completion state the user saw.
    Toggle { id: i64, previous_completed: bool },
    Delete { id: i64 },
}

/// What to do with the response to a request that is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    op: Op,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Load,
    Create,
    Replace(i64),
    Delete(i64),
}

impl Op {
    fn failure(self) -> SyncError {
        match self {
            Op::Load => SyncError::FetchFailed,
            Op::Create => SyncError::CreateFailed,
            Op::Replace(_) => SyncError::UpdateFailed,
            Op::Delete(_) => SyncError::DeleteFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Synchronizer {
    client: TodoClient,
    todos: Vec<Todo>,
    error: Option<SyncError>,
    pending_loads: usize,
}

impl Synchronizer {
    pub fn new(client: TodoClient) -> Self {
        Self {
            client,
            todos: Vec::new(),
            error: None,
            pending_loads: 0,
        }
    }

    /// The collection in arrival order.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: i64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn error(&self) -> Option<SyncError> {
        self.error
    }

    /// True while any load started with `begin_load` has not completed.
    pub fn is_loading(&self) -> bool {
        self.pending_loads > 0
    }

    pub fn view(&self, filter: Filter) -> Vec<&Todo> {
        view::project(&self.todos, filter)
    }

    pub fn counts(&self) -> Counts {
        view::counts(&self.todos)
    }

    // --- split form ---

    pub fn begin_load(&mut self) -> (Ticket, HttpRequest) {
        self.pending_loads += 1;
        (Ticket { op: Op::Load }, self.client.build_list_todos())
    }

    /// Prepare the request for `command`.
    ///
    /// Returns `Ok(None)` when the command targets an id that is not in the
    /// collection: nothing is sent and the error slot is left alone. Invalid
    /// create input is rejected before anything is sent.
    pub fn begin(&mut self, command: Command) -> Result<Option<(Ticket, HttpRequest)>, ValidationError> {
        let (op, built) = match command {
            Command::Create(input) => {
                let body = input.into_request()?;
                (Op::Create, self.client.build_create_todo(&body))
            }
            Command::Update { id, patch } => {
                let Some(current) = self.get(id) else {
                    debug!(id, "update skipped, todo not in collection");
                    return Ok(None);
                };
                let body = patch.merge(current);
                (Op::Replace(id), self.client.build_replace_todo(id, &body))
            }
            Command::Toggle { id, previous_completed } => {
                let Some(current) = self.get(id) else {
                    debug!(id, "toggle skipped, todo not in collection");
                    return Ok(None);
                };
                let body = TodoRequest {
                    complete: !previous_completed,
                    ..TodoRequest::from(current)
                };
                (Op::Replace(id), self.client.build_replace_todo(id, &body))
            }
            Command::Delete { id } => (Op::Delete(id), Ok(self.client.build_delete_todo(id))),
        };

        match built {
            Ok(request) => Ok(Some((Ticket { op }, request))),
            Err(e) => {
                self.fail(op.failure(), &RequestError::Api(e));
                Ok(None)
            }
        }
    }

    /// Reconcile the collection with the outcome of a request started by
    /// `begin` or `begin_load`.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<HttpResponse, TransportError>) {
        let op = ticket.op;
        let result = match op {
            Op::Load => {
                self.pending_loads = self.pending_loads.saturating_sub(1);
                parse(outcome, |r| self.client.parse_list_todos(r)).map(|todos| {
                    self.todos = todos;
                })
            }
            Op::Create => parse(outcome, |r| self.client.parse_create_todo(r)).map(|todo| {
                match self.todos.iter_mut().find(|t| t.id == todo.id) {
                    Some(existing) => *existing = todo,
                    None => self.todos.push(todo),
                }
            }),
            Op::Replace(id) => parse(outcome, |r| self.client.parse_replace_todo(r)).map(|todo| {
                self.replace(id, todo);
            }),
            Op::Delete(id) => parse(outcome, |r| self.client.parse_delete_todo(r)).map(|()| {
                self.todos.retain(|t| t.id != id);
            }),
        };

        match result {
            Ok(()) => self.error = None,
            Err(e) => self.fail(op.failure(), &e),
        }
    }

    // --- one-shot form ---

    /// Fetch the full collection, replacing the local one on success.
    pub fn load<T: Transport + ?Sized>(&mut self, session: &mut Session, transport: &mut T) {
        let (ticket, request) = self.begin_load();
        let outcome = session.execute(transport, request);
        self.complete(ticket, outcome);
    }

    /// Run `command` to completion.
    pub fn dispatch<T: Transport + ?Sized>(
        &mut self,
        command: Command,
        session: &mut Session,
        transport: &mut T,
    ) -> Result<(), ValidationError> {
        let Some((ticket, request)) = self.begin(command)? else {
            return Ok(());
        };
        let outcome = session.execute(transport, request);
        self.complete(ticket, outcome);
        Ok(())
    }

    /// Put `todo` where `id` was. Any other entry already holding the
    /// returned id is dropped so ids stay unique.
    fn replace(&mut self, id: i64, todo: Todo) {
        let Some(position) = self.todos.iter().position(|t| t.id == id) else {
            return;
        };
        if todo.id != id {
            warn!(requested = id, returned = todo.id, "server answered with a different id");
        }
        let returned = todo.id;
        self.todos[position] = todo;
        let mut index = 0;
        self.todos.retain(|t| {
            let keep = index == position || t.id != returned;
            index += 1;
            keep
        });
    }

    fn fail(&mut self, error: SyncError, cause: &RequestError) {
        warn!(error = %error, cause = %cause, "todo operation failed");
        self.error = Some(error);
    }
}

fn parse<R>(
    outcome: Result<HttpResponse, TransportError>,
    parse: impl FnOnce(HttpResponse) -> Result<R, ApiError>,
) -> Result<R, RequestError> {
    let response = outcome?;
    Ok(parse(response)?)
}
