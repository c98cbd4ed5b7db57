//! Domain DTOs for the todo resource.
//!
//! # Design
//! The remote contract only accepts whole-object replacement, so the same
//! `TodoRequest` body is used for create (POST) and replace (PUT). `NewTodo`
//! and `TodoPatch` are the client-side inputs that get turned into a
//! `TodoRequest`: the first through form validation, the second by merging
//! with the item it edits.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length, in characters, of a title or description.
pub const MAX_TEXT_LEN: usize = 100;

/// Priority a fresh form starts with (Medium).
pub const DEFAULT_PRIORITY: u8 = 3;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: u8,
    #[serde(default)]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
}

impl Todo {
    pub fn priority_label(&self) -> &'static str {
        priority_label(self.priority)
    }
}

/// Full request body for creating or replacing a todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoRequest {
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub complete: bool,
}

impl From<&Todo> for TodoRequest {
    fn from(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone(),
            priority: todo.priority,
            complete: todo.complete,
        }
    }
}

/// Input of the "add todo" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub priority: u8,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: u8) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
        }
    }

    /// Validate the form and produce the create body. New todos always start
    /// incomplete; surrounding whitespace is trimmed.
    pub fn into_request(self) -> Result<TodoRequest, ValidationError> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        if title.is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if title.chars().count() > MAX_TEXT_LEN {
            return Err(ValidationError::TitleTooLong);
        }
        if description.chars().count() > MAX_TEXT_LEN {
            return Err(ValidationError::DescriptionTooLong);
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(ValidationError::PriorityOutOfRange);
        }

        Ok(TodoRequest {
            title,
            description,
            priority: self.priority,
            complete: false,
        })
    }
}

/// Edits to an existing todo. Omitted fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(0)` counts as omitted.
    pub priority: Option<u8>,
    pub complete: Option<bool>,
}

impl TodoPatch {
    /// Merge onto `current`, producing the full replacement body.
    pub fn merge(&self, current: &Todo) -> TodoRequest {
        TodoRequest {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            priority: self
                .priority
                .filter(|p| *p != 0)
                .unwrap_or(current.priority),
            complete: self.complete.unwrap_or(current.complete),
        }
    }
}

/// Human label for a priority level; unknown levels read as Medium.
pub fn priority_label(priority: u8) -> &'static str {
    match priority {
        1 => "Very High",
        2 => "High",
        3 => "Medium",
        4 => "Low",
        5 => "Very Low",
        _ => "Medium",
    }
}
