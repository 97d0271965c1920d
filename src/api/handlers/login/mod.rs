//! `POST /login`: email/password validation against a read-only credential store.

mod audit;
mod credentials;
mod email;

pub use self::audit::{AuditLog, TracingAuditLog};
pub use self::credentials::{CredentialStore, StaticCredentials, secrets_match, verify_credentials};
pub use self::email::{MAX_EMAIL_LEN, valid_email};

use axum::{
    body::Bytes,
    extract::{Extension, rejection::BytesRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, instrument};
use utoipa::ToSchema;

const EVENT_METHOD: &str = "Rejected login request with unsupported method";
const EVENT_DECODE: &str = "Cannot decode login request body";
const EVENT_FORMAT: &str = "Invalid email format in request";
const EVENT_CREDENTIALS: &str = "Invalid email or password in request";
const EVENT_SUCCESS: &str = "Successful login request";

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    email: String,
    #[schema(value_type = String, format = Password)]
    #[serde(deserialize_with = "deserialize_secret")]
    password: SecretString,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        let password: String = password.into();
        Self {
            email: email.into(),
            password: SecretString::from(password),
        }
    }
}

/// Why a login request was rejected. Each variant maps to one fixed response.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    #[error("Invalid request method")]
    MethodNotAllowed,
    #[error("Cannot decode body")]
    Decode,
    #[error("Invalid email format")]
    InvalidEmailFormat,
    /// Covers both an unknown email and a wrong password.
    #[error("Invalid Email or Password")]
    InvalidCredentials,
}

impl LoginError {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Decode | Self::InvalidEmailFormat => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Shared, read-only dependencies of the login handler.
#[derive(Clone)]
pub struct LoginState {
    credentials: Arc<dyn CredentialStore>,
    audit: Arc<dyn AuditLog>,
}

impl LoginState {
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { credentials, audit }
    }
}

impl Default for LoginState {
    fn default() -> Self {
        Self::new(
            Arc::new(StaticCredentials::default()),
            Arc::new(TracingAuditLog),
        )
    }
}

impl fmt::Debug for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginState").finish_non_exhaustive()
    }
}

/// Validate a decoded login request.
///
/// # Errors
/// `InvalidEmailFormat` when the email fails [`valid_email`], `InvalidCredentials`
/// when the email is unknown or the password does not match.
pub fn authenticate(state: &LoginState, request: &LoginRequest) -> Result<(), LoginError> {
    if !valid_email(&request.email) {
        state.audit.warn(EVENT_FORMAT);
        return Err(LoginError::InvalidEmailFormat);
    }

    if !verify_credentials(
        state.credentials.as_ref(),
        &request.email,
        request.password.expose_secret(),
    ) {
        state.audit.warn(EVENT_CREDENTIALS);
        return Err(LoginError::InvalidCredentials);
    }

    state.audit.info(EVENT_SUCCESS);

    Ok(())
}

/// Run the full login sequence over a raw request: method, body decode, then [`authenticate`].
///
/// # Errors
/// Returns the first [`LoginError`] hit along that sequence.
pub fn handle_login(state: &LoginState, method: &Method, body: &[u8]) -> Result<(), LoginError> {
    if method != Method::POST {
        state.audit.warn(EVENT_METHOD);
        return Err(LoginError::MethodNotAllowed);
    }

    let request: LoginRequest = serde_json::from_slice(body).map_err(|err| {
        debug!("login body rejected: {:?}", err.classify());
        state.audit.warn(EVENT_DECODE);
        LoginError::Decode
    })?;

    authenticate(state, &request)
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful"),
        (status = 400, description = "Cannot decode body or invalid email format", body = String, content_type = "text/plain"),
        (status = 401, description = "Invalid email or password", body = String, content_type = "text/plain"),
        (status = 405, description = "Invalid request method", body = String, content_type = "text/plain"),
    ),
    tag= "login"
)]
// axum handler for login; mounted for every method so non-POST gets the 405 body
#[instrument(skip_all, fields(http.method = %method))]
pub async fn login(
    Extension(state): Extension<Arc<LoginState>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let outcome = match body {
        Ok(body) => handle_login(&state, &method, &body),
        Err(rejection) if method == Method::POST => {
            debug!("login body unreadable: {}", rejection.status());
            state.audit.warn(EVENT_DECODE);
            Err(LoginError::Decode)
        }
        Err(_) => handle_login(&state, &method, &[]),
    };

    match outcome {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::audit::recording::{Level, RecordingAuditLog};
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;

    fn recording_state() -> (LoginState, Arc<RecordingAuditLog>) {
        let audit = Arc::new(RecordingAuditLog::default());
        let state = LoginState::new(Arc::new(StaticCredentials::default()), audit.clone());
        (state, audit)
    }

    fn body(email: &str, password: &str) -> Vec<u8> {
        serde_json::json!({ "email": email, "password": password })
            .to_string()
            .into_bytes()
    }

    #[test]
    fn correct_credentials_are_accepted() {
        let (state, audit) = recording_state();
        let result = handle_login(
            &state,
            &Method::POST,
            &body("user1@example.com", "password12345"),
        );
        assert_eq!(result, Ok(()));
        assert_eq!(
            audit.events(),
            vec![(Level::Info, EVENT_SUCCESS.to_string())]
        );
    }

    #[test]
    fn every_seed_account_logs_in() {
        let (state, _) = recording_state();
        for (email, password) in [
            ("user2@example.com", "B7rx9OkWVdx13$QF6Imq"),
            ("user3@example.com", "hoxnNT4g&ER0&9Nz0pLO"),
            ("user4@example.com", "Log4Fun"),
        ] {
            assert_eq!(
                handle_login(&state, &Method::POST, &body(email, password)),
                Ok(()),
                "{email}"
            );
        }
    }

    #[test]
    fn non_post_methods_are_rejected() {
        let (state, audit) = recording_state();
        for method in [
            Method::GET,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::HEAD,
            Method::OPTIONS,
        ] {
            let result = handle_login(&state, &method, &body("user1@example.com", "password12345"));
            assert_eq!(result, Err(LoginError::MethodNotAllowed), "{method}");
        }
        assert!(audit.events().iter().all(|(level, _)| *level == Level::Warn));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let (state, _) = recording_state();
        let payload = serde_json::json!({
            "email": "user1@example.com",
            "password": "password12345",
            "admin": true
        })
        .to_string();
        assert_eq!(
            handle_login(&state, &Method::POST, payload.as_bytes()),
            Err(LoginError::Decode)
        );
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        let (state, _) = recording_state();
        for payload in [
            "",
            "{",
            "null",
            "[]",
            r#"{"email":"user1@example.com"}"#,
            r#"{"password":"password12345"}"#,
            r#"{"email":1,"password":"password12345"}"#,
            r#"{"email":"user1@example.com","password":"password12345"} trailing"#,
        ] {
            assert_eq!(
                handle_login(&state, &Method::POST, payload.as_bytes()),
                Err(LoginError::Decode),
                "{payload:?}"
            );
        }
    }

    #[test]
    fn field_names_are_matched_exactly() {
        let (state, _) = recording_state();
        for payload in [
            r#"{"Email":"user1@example.com","Password":"password12345"}"#,
            r#"{"EMAIL":"user1@example.com","password":"password12345"}"#,
        ] {
            assert_eq!(
                handle_login(&state, &Method::POST, payload.as_bytes()),
                Err(LoginError::Decode),
                "{payload}"
            );
        }
    }

    #[test]
    fn invalid_email_format_is_rejected_without_echoing_input() {
        let (state, audit) = recording_state();
        let result = handle_login(&state, &Method::POST, &body("a@@b.com", "password12345"));
        assert_eq!(result, Err(LoginError::InvalidEmailFormat));
        assert_eq!(audit.events(), vec![(Level::Warn, EVENT_FORMAT.to_string())]);
        assert!(!LoginError::InvalidEmailFormat.to_string().contains("a@@b.com"));
    }

    #[test]
    fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (state, audit) = recording_state();
        let wrong = handle_login(
            &state,
            &Method::POST,
            &body("user1@example.com", "password1234"),
        );
        let unknown = handle_login(
            &state,
            &Method::POST,
            &body("nobody@example.com", "password12345"),
        );
        assert_eq!(wrong, Err(LoginError::InvalidCredentials));
        assert_eq!(wrong, unknown);

        let events = audit.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], events[1]);
    }

    #[test]
    fn audit_events_never_contain_request_data() {
        let (state, audit) = recording_state();
        let _ = handle_login(
            &state,
            &Method::POST,
            &body("user1@example.com", "password12345"),
        );
        let _ = handle_login(
            &state,
            &Method::POST,
            &body("user1@example.com", "hunter2-guess"),
        );
        for (_, event) in audit.events() {
            assert!(!event.contains("user1@example.com"));
            assert!(!event.contains("password12345"));
            assert!(!event.contains("hunter2-guess"));
        }
    }

    #[test]
    fn request_debug_redacts_password() {
        let request = LoginRequest::new("user1@example.com", "password12345");
        let rendered = format!("{request:?}");
        assert!(rendered.contains("user1@example.com"));
        assert!(!rendered.contains("password12345"));
    }

    #[test]
    fn injected_store_replaces_seed_table() {
        let audit = Arc::new(RecordingAuditLog::default());
        let state = LoginState::new(
            Arc::new(StaticCredentials::new([("fixture@example.test", "fixture-secret")])),
            audit,
        );
        assert_eq!(
            authenticate(
                &state,
                &LoginRequest::new("fixture@example.test", "fixture-secret")
            ),
            Ok(())
        );
        assert_eq!(
            authenticate(
                &state,
                &LoginRequest::new("user1@example.com", "password12345")
            ),
            Err(LoginError::InvalidCredentials)
        );
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            LoginError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(LoginError::Decode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            LoginError::InvalidEmailFormat.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LoginError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn error_response_carries_fixed_body() -> Result<()> {
        let response = LoginError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"Invalid Email or Password");
        Ok(())
    }

    #[tokio::test]
    async fn login_handler_returns_empty_ok() -> Result<()> {
        let state = Arc::new(recording_state().0);
        let response = login(
            Extension(state),
            Method::POST,
            Ok(Bytes::from(body("user1@example.com", "password12345"))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(body.is_empty());
        Ok(())
    }
}
