//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Credentials are not added here; `Session::authorize` decorates the request
//! on its way to the transport.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::account::{LoginRequest, PasswordChange, ProfileUpdate, RegisterRequest, TokenResponse, User};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Todo, TodoRequest};

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- todos ---

    pub fn build_list_todos(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/todos/")
    }

    pub fn build_create_todo(&self, input: &TodoRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/todos/", input)
    }

    pub fn build_replace_todo(&self, id: i64, input: &TodoRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/todos/{id}"), input)
    }

    pub fn build_delete_todo(&self, id: i64) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/todos/{id}"))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        check_status(&response, 200)?;
        parse_body(&response)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 201)?;
        parse_body(&response)
    }

    pub fn parse_replace_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 200)?;
        parse_body(&response)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)?;
        Ok(())
    }

    // --- auth ---

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/register", input)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", input)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<TokenResponse, ApiError> {
        check_status(&response, 201)?;
        parse_body(&response)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<TokenResponse, ApiError> {
        check_status(&response, 200)?;
        parse_body(&response)
    }

    // --- users ---

    pub fn build_get_profile(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/users/me")
    }

    pub fn build_update_profile(&self, input: &ProfileUpdate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, "/users/me", input)
    }

    pub fn build_change_password(&self, input: &PasswordChange) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, "/users/user/password", input)
    }

    pub fn parse_get_profile(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, 200)?;
        parse_body(&response)
    }

    pub fn parse_update_profile(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, 200)?;
        parse_body(&response)
    }

    pub fn parse_change_password(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)?;
        Ok(())
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

fn parse_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        status if status == expected => Ok(()),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound),
        status @ (400 | 422) => Err(ApiError::Rejected {
            status,
            detail: error_detail(&response.body),
        }),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Pull the human-readable part out of a `{"detail": ...}` error body.
///
/// `detail` is either a string or a list of validation entries carrying a
/// `msg`. Anything else falls back to the raw body.
fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(entries)) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                body.to_string()
            } else {
                messages.join("; ")
            }
        }
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TodoClient {
        TodoClient::new("http://localhost:8000")
    }

    fn todo_request() -> TodoRequest {
        TodoRequest {
            title: "Buy milk".to_string(),
            description: String::new(),
            priority: 3,
            complete: false,
        }
    }

    #[test]
    fn build_list_todos_produces_correct_request() {
        let req = client().build_list_todos();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:8000/todos/");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_create_todo_produces_correct_request() {
        let req = client().build_create_todo(&todo_request()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8000/todos/");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"title": "Buy milk", "description": "", "priority": 3, "complete": false})
        );
    }

    #[test]
    fn build_replace_todo_sends_full_object() {
        let req = client().build_replace_todo(7, &todo_request()).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:8000/todos/7");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["priority"], 3);
        assert_eq!(body["complete"], false);
    }

    #[test]
    fn build_delete_todo_produces_correct_request() {
        let req = client().build_delete_todo(7);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:8000/todos/7");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_account_requests_hit_expected_paths() {
        let c = client();
        let login = c.build_login(&LoginRequest::new("a@b.c", "pw").unwrap()).unwrap();
        assert_eq!(login.path, "http://localhost:8000/auth/login");
        assert_eq!(login.method, HttpMethod::Post);

        let profile = c.build_get_profile();
        assert_eq!(profile.path, "http://localhost:8000/users/me");

        let update = c.build_update_profile(&ProfileUpdate::from_form("Ada", "", "")).unwrap();
        assert_eq!(update.method, HttpMethod::Put);
        assert_eq!(update.body.as_deref(), Some(r#"{"first_name":"Ada"}"#));

        let pw = c
            .build_change_password(&PasswordChange::new("old", "newpass").unwrap())
            .unwrap();
        assert_eq!(pw.path, "http://localhost:8000/users/user/password");
    }

    #[test]
    fn parse_list_todos_success() {
        let response = HttpResponse::new(
            200,
            r#"[{"id":1,"title":"Test","description":"d","priority":2,"complete":false,"owner_id":1}]"#,
        );
        let todos = client().parse_list_todos(response).unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Test");
        assert_eq!(todos[0].priority, 2);
    }

    #[test]
    fn parse_create_todo_wrong_status() {
        let response = HttpResponse::new(500, "internal error");
        let err = client().parse_create_todo(response).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_replace_todo_not_found() {
        let response = HttpResponse::new(404, r#"{"detail":"todo not found"}"#);
        let err = client().parse_replace_todo(response).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_unauthorized() {
        let response = HttpResponse::new(401, r#"{"detail":"Authentication Failed"}"#);
        let err = client().parse_list_todos(response).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn parse_rejected_extracts_string_detail() {
        let response = HttpResponse::new(400, r#"{"detail":"User with this email already exists"}"#);
        let err = client().parse_register(response).unwrap_err();
        match err {
            ApiError::Rejected { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "User with this email already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_rejected_joins_validation_messages() {
        let response = HttpResponse::new(
            422,
            r#"{"detail":[{"loc":["body","priority"],"msg":"must be between 1 and 5"},{"msg":"title too short"}]}"#,
        );
        let err = client().parse_create_todo(response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "request rejected (422): must be between 1 and 5; title too short"
        );
    }

    #[test]
    fn parse_rejected_falls_back_to_raw_body() {
        let response = HttpResponse::new(422, "Failed to deserialize the JSON body");
        let err = client().parse_create_todo(response).unwrap_err();
        assert!(
            matches!(err, ApiError::Rejected { ref detail, .. } if detail == "Failed to deserialize the JSON body")
        );
    }

    #[test]
    fn parse_delete_todo_success() {
        assert!(client().parse_delete_todo(HttpResponse::new(204, "")).is_ok());
    }

    #[test]
    fn parse_login_success() {
        let response = HttpResponse::new(
            200,
            r#"{"access_token":"tok","token_type":"bearer","user":{"id":1,"email":"a@b.c","username":"a","first_name":"A","last_name":"","role":"user","phone_number":"","is_active":true}}"#,
        );
        let token = client().parse_login(response).unwrap();
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.user.username, "a");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = TodoClient::new("http://localhost:8000/");
        let req = client.build_list_todos();
        assert_eq!(req.path, "http://localhost:8000/todos/");
    }

    #[test]
    fn parse_list_todos_bad_json() {
        let err = client().parse_list_todos(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
