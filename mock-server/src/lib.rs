use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

const MAX_DESCRIPTION_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub complete: bool,
    pub owner_id: i64,
}

#[derive(Deserialize)]
pub struct TodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: u8,
    pub complete: bool,
}

impl TodoRequest {
    fn validate(&self) -> Result<(), ServerError> {
        if self.title.is_empty() {
            return Err(ServerError::Invalid("title must not be empty"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ServerError::Invalid("description must be at most 100 characters"));
        }
        if !(1..=5).contains(&self.priority) {
            return Err(ServerError::Invalid("priority must be between 1 and 5"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: String,
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordChange {
    pub password: String,
    pub new_password: String,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Authentication Failed")]
    Unauthorized,
    #[error("Invalid email or password")]
    BadCredentials,
    #[error("Error on password change")]
    WrongPassword,
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("User with this email already exists")]
    DuplicateEmail,
    #[error("todo not found")]
    NotFound,
    #[error("{0}")]
    Invalid(&'static str),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            ServerError::Unauthorized | ServerError::BadCredentials | ServerError::WrongPassword => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::MissingCredentials | ServerError::DuplicateEmail => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct Store {
    accounts: BTreeMap<i64, Account>,
    todos: BTreeMap<i64, Todo>,
    tokens: HashMap<String, i64>,
    next_user_id: i64,
    next_todo_id: i64,
}

impl Store {
    /// A new sign-in replaces the user's previous token.
    fn issue_token(&mut self, user_id: i64) -> String {
        self.tokens.retain(|_, owner| *owner != user_id);
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn owned_todo(&self, owner_id: i64, id: i64) -> Result<&Todo, ServerError> {
        self.todos
            .get(&id)
            .filter(|t| t.owner_id == owner_id)
            .ok_or(ServerError::NotFound)
    }

    fn owned_todo_mut(&mut self, owner_id: i64, id: i64) -> Result<&mut Todo, ServerError> {
        self.todos
            .get_mut(&id)
            .filter(|t| t.owner_id == owner_id)
            .ok_or(ServerError::NotFound)
    }

    fn account(&self, user_id: i64) -> Result<&Account, ServerError> {
        self.accounts.get(&user_id).ok_or(ServerError::Unauthorized)
    }

    fn account_mut(&mut self, user_id: i64) -> Result<&mut Account, ServerError> {
        self.accounts.get_mut(&user_id).ok_or(ServerError::Unauthorized)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// The user a bearer token resolves to.
pub struct CurrentUser(pub i64);

impl FromRequestParts<Db> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ServerError::Unauthorized)?;
        let store = db.read().await;
        store
            .tokens
            .get(token)
            .copied()
            .map(CurrentUser)
            .ok_or(ServerError::Unauthorized)
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/healthy", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/users/me", get(get_profile).put(update_profile))
        .route("/users/user/password", put(change_password))
        .route("/todos/", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("mock todo API on {addr}");
    }
    axum::serve(listener, app()).await
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "Healthy" }))
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ServerError> {
    if input.email.is_empty() || input.password.is_empty() {
        return Err(ServerError::MissingCredentials);
    }
    let username = input.email.split('@').next().unwrap_or_default().to_string();

    let mut store = db.write().await;
    let taken = store
        .accounts
        .values()
        .any(|a| a.user.email == input.email || a.user.username == username);
    if taken {
        return Err(ServerError::DuplicateEmail);
    }

    let (first_name, last_name) = match input.full_name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (input.full_name.clone(), String::new()),
    };
    store.next_user_id += 1;
    let user = User {
        id: store.next_user_id,
        email: input.email,
        username,
        first_name,
        last_name,
        role: "user".to_string(),
        phone_number: input.phone_number,
        is_active: true,
    };
    store.accounts.insert(
        user.id,
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    let access_token = store.issue_token(user.id);
    info!(user_id = user.id, "registered");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            user,
        }),
    ))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServerError> {
    if input.email.is_empty() || input.password.is_empty() {
        return Err(ServerError::MissingCredentials);
    }
    let mut store = db.write().await;
    let user = store
        .accounts
        .values()
        .find(|a| a.user.email == input.email && a.password == input.password)
        .map(|a| a.user.clone())
        .ok_or(ServerError::BadCredentials)?;
    let access_token = store.issue_token(user.id);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user,
    }))
}

async fn get_profile(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<User>, ServerError> {
    let store = db.read().await;
    Ok(Json(store.account(user_id)?.user.clone()))
}

async fn update_profile(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<ProfileUpdate>,
) -> Result<Json<User>, ServerError> {
    let mut store = db.write().await;
    let user = &mut store.account_mut(user_id)?.user;
    if let Some(first_name) = input.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = input.last_name {
        user.last_name = last_name;
    }
    if let Some(phone_number) = input.phone_number {
        user.phone_number = phone_number;
    }
    Ok(Json(user.clone()))
}

async fn change_password(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<PasswordChange>,
) -> Result<StatusCode, ServerError> {
    if input.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServerError::Invalid("new_password must be at least 6 characters"));
    }
    let mut store = db.write().await;
    let account = store.account_mut(user_id)?;
    if account.password != input.password {
        return Err(ServerError::WrongPassword);
    }
    account.password = input.new_password;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_todos(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
) -> Json<Vec<Todo>> {
    let store = db.read().await;
    Json(
        store
            .todos
            .values()
            .filter(|t| t.owner_id == user_id)
            .cloned()
            .collect(),
    )
}

async fn create_todo(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<TodoRequest>,
) -> Result<(StatusCode, Json<Todo>), ServerError> {
    input.validate()?;
    let mut store = db.write().await;
    store.next_todo_id += 1;
    let todo = Todo {
        id: store.next_todo_id,
        title: input.title,
        description: input.description,
        priority: input.priority,
        complete: input.complete,
        owner_id: user_id,
    };
    store.todos.insert(todo.id, todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, ServerError> {
    let store = db.read().await;
    Ok(Json(store.owned_todo(user_id, id)?.clone()))
}

async fn update_todo(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<TodoRequest>,
) -> Result<Json<Todo>, ServerError> {
    input.validate()?;
    let mut store = db.write().await;
    let todo = store.owned_todo_mut(user_id, id)?;
    todo.title = input.title;
    todo.description = input.description;
    todo.priority = input.priority;
    todo.complete = input.complete;
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    let mut store = db.write().await;
    store.owned_todo(user_id, id)?;
    store.todos.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}
