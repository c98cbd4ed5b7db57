//! Explicit authentication context.
//!
//! # Design
//! A `Session` is created at start-up, updated on login/register/logout, and
//! passed by `&mut` to anything that issues requests. Every outgoing request
//! goes through `Session::execute`, which attaches the bearer credential and
//! drops it again when the server answers 401. Login and register run through
//! their own flows here, where a 401 only means the credentials were wrong.

use tracing::{debug, info, warn};

use crate::account::{LoginRequest, PasswordChange, ProfileUpdate, RegisterForm, TokenResponse, User};
use crate::client::TodoClient;
use crate::error::{ApiError, RequestError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume with a token obtained earlier. The user is unknown until
    /// `refresh_profile` runs.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
    }

    /// Attach `authorization: Bearer <token>` when signed in.
    pub fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(token) = &self.token {
            request
                .headers
                .push(("authorization".to_string(), format!("Bearer {token}")));
        }
        request
    }

    /// Authorize and execute `request` on behalf of the signed-in user,
    /// clearing the credential on a 401.
    pub fn execute<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        self.round_trip(transport, request, SignOut::OnUnauthorized)
    }

    fn round_trip<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        request: HttpRequest,
        sign_out: SignOut,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.authorize(request);
        let path = request.path.clone();
        debug!(method = %request.method, %path, "sending request");

        let response = transport.execute(request)?;
        debug!(status = response.status, %path, "received response");

        if response.status == 401 && sign_out == SignOut::OnUnauthorized && self.token.is_some() {
            warn!(%path, "credential rejected, signing out");
            self.logout();
        }
        Ok(response)
    }

    /// Execute and parse in one go.
    pub fn send<T, R>(
        &mut self,
        transport: &mut T,
        request: HttpRequest,
        parse: impl FnOnce(HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, RequestError>
    where
        T: Transport + ?Sized,
    {
        let response = self.execute(transport, request)?;
        Ok(parse(response)?)
    }

    pub fn login<T: Transport + ?Sized>(
        &mut self,
        client: &TodoClient,
        transport: &mut T,
        email: &str,
        password: &str,
    ) -> Result<&User, RequestError> {
        let input = LoginRequest::new(email, password)?;
        let request = client.build_login(&input)?;
        let response = self.round_trip(transport, request, SignOut::Never)?;
        let token = client.parse_login(response)?;
        Ok(self.sign_in(token))
    }

    pub fn register<T: Transport + ?Sized>(
        &mut self,
        client: &TodoClient,
        transport: &mut T,
        form: RegisterForm,
    ) -> Result<&User, RequestError> {
        let input = form.into_request()?;
        let request = client.build_register(&input)?;
        let response = self.round_trip(transport, request, SignOut::Never)?;
        let token = client.parse_register(response)?;
        Ok(self.sign_in(token))
    }

    pub fn refresh_profile<T: Transport + ?Sized>(
        &mut self,
        client: &TodoClient,
        transport: &mut T,
    ) -> Result<&User, RequestError> {
        let user = self.send(transport, client.build_get_profile(), |r| client.parse_get_profile(r))?;
        let user: &User = self.user.insert(user);
        Ok(user)
    }

    pub fn update_profile<T: Transport + ?Sized>(
        &mut self,
        client: &TodoClient,
        transport: &mut T,
        update: &ProfileUpdate,
    ) -> Result<&User, RequestError> {
        let request = client.build_update_profile(update)?;
        let user = self.send(transport, request, |r| client.parse_update_profile(r))?;
        info!(user_id = user.id, "profile updated");
        let user: &User = self.user.insert(user);
        Ok(user)
    }

    pub fn change_password<T: Transport + ?Sized>(
        &mut self,
        client: &TodoClient,
        transport: &mut T,
        change: &PasswordChange,
    ) -> Result<(), RequestError> {
        let request = client.build_change_password(change)?;
        self.send(transport, request, |r| client.parse_change_password(r))
    }

    fn sign_in(&mut self, token: TokenResponse) -> &User {
        info!(user_id = token.user.id, "signed in");
        self.token = Some(token.access_token);
        self.user.insert(token.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignOut {
    OnUnauthorized,
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::testing::ScriptedTransport;

    const TOKEN_BODY: &str = r#"{"access_token":"tok-1","token_type":"bearer","user":{"id":3,"email":"ada@example.com","username":"ada","first_name":"Ada","last_name":"Lovelace","role":"user","phone_number":"","is_active":true}}"#;

    const USER_BODY: &str = r#"{"id":3,"email":"ada@example.com","username":"ada","first_name":"Ada","last_name":"King","role":"user","phone_number":"555","is_active":true}"#;

    fn client() -> TodoClient {
        TodoClient::new("http://localhost:8000")
    }

    #[test]
    fn authorize_adds_bearer_header_only_when_signed_in() {
        let req = client().build_list_todos();
        assert_eq!(Session::new().authorize(req.clone()).header("authorization"), None);
        let authorized = Session::with_token("abc").authorize(req);
        assert_eq!(authorized.header("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn login_stores_token_and_user() {
        let mut transport = ScriptedTransport::new().respond(200, TOKEN_BODY);
        let mut session = Session::new();
        let user = session
            .login(&client(), &mut transport, "ada@example.com", "secret")
            .unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(session.token(), Some("tok-1"));
        assert_eq!(transport.requests[0].method, HttpMethod::Post);
        assert_eq!(transport.last_body()["email"], "ada@example.com");
    }

    #[test]
    fn failed_login_keeps_existing_session() {
        let mut transport = ScriptedTransport::new()
            .respond(401, r#"{"detail":"Invalid email or password"}"#);
        let mut session = Session::with_token("old");
        let err = session
            .login(&client(), &mut transport, "ada@example.com", "wrong")
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(session.token(), Some("old"));
    }

    #[test]
    fn unauthorized_todo_request_clears_credential() {
        let mut transport = ScriptedTransport::new().respond(401, r#"{"detail":"could not validate"}"#);
        let mut session = Session::with_token("expired");
        let response = session.execute(&mut transport, client().build_list_todos()).unwrap();
        assert_eq!(response.status, 401);
        assert!(!session.is_authenticated());
        assert_eq!(
            transport.requests[0].header("authorization"),
            Some("Bearer expired")
        );
    }

    #[test]
    fn auth_segment_in_base_url_does_not_shield_todo_requests() {
        let client = TodoClient::new("https://host/auth/api");
        let mut transport = ScriptedTransport::new().respond(401, r#"{"detail":"could not validate"}"#);
        let mut session = Session::with_token("expired");
        session.execute(&mut transport, client.build_list_todos()).unwrap();
        assert_eq!(transport.requests[0].path, "https://host/auth/api/todos/");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn rejected_password_change_signs_out() {
        let mut transport = ScriptedTransport::new().respond(401, r#"{"detail":"Error on password change"}"#);
        let mut session = Session::with_token("tok");
        let change = PasswordChange::new("wrong", "secret2").unwrap();
        let err = session
            .change_password(&client(), &mut transport, &change)
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn register_validates_before_sending() {
        let mut transport = ScriptedTransport::new();
        let mut session = Session::new();
        let form = RegisterForm {
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
            confirm_password: "different".to_string(),
            ..RegisterForm::default()
        };
        let err = session.register(&client(), &mut transport, form).unwrap_err();
        assert!(matches!(err, RequestError::Invalid(_)));
        assert!(transport.requests.is_empty());
    }

    #[test]
    fn register_signs_in() {
        let mut transport = ScriptedTransport::new().respond(201, TOKEN_BODY);
        let mut session = Session::new();
        let form = RegisterForm {
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
            full_name: "Ada Lovelace".to_string(),
            phone_number: String::new(),
        };
        session.register(&client(), &mut transport, form).unwrap();
        assert!(session.is_authenticated());
        let body = transport.last_body();
        assert_eq!(body["full_name"], "Ada Lovelace");
        assert!(body.get("confirm_password").is_none());
    }

    #[test]
    fn update_profile_replaces_cached_user() {
        let mut transport = ScriptedTransport::new()
            .respond(200, TOKEN_BODY)
            .respond(200, USER_BODY);
        let mut session = Session::new();
        session
            .login(&client(), &mut transport, "ada@example.com", "secret")
            .unwrap();
        let update = ProfileUpdate::from_form("", "King", "555");
        let user = session
            .update_profile(&client(), &mut transport, &update)
            .unwrap();
        assert_eq!(user.last_name, "King");
        assert_eq!(transport.last_body(), serde_json::json!({"last_name": "King", "phone_number": "555"}));
        assert_eq!(session.user().map(|u| u.phone_number.as_str()), Some("555"));
    }

    #[test]
    fn transport_failure_is_reported() {
        let mut transport = ScriptedTransport::new().fail("connection refused");
        let mut session = Session::with_token("t");
        let err = session.refresh_profile(&client(), &mut transport).unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
        assert!(session.is_authenticated());
    }
}
