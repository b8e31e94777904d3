//! Email/password sign-in against the hosted auth service.

use super::BackendClient;
use crate::error::{KitError, Result};
use crate::settings::StoredSession;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::info;

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Check the form fields before any network call.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(KitError::Validation("Email is required".into()));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(KitError::Validation("Email is invalid".into()));
    }
    if password.is_empty() {
        return Err(KitError::Validation("Password is required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(KitError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

/// Exchange credentials for a session. The caller decides whether to persist it.
pub async fn sign_in(client: &BackendClient, email: &str, password: &str) -> Result<StoredSession> {
    validate_credentials(email, password)?;
    let email = email.trim();

    let url = format!("{}/auth/v1/token", client.base_url());
    let req = client
        .http()
        .post(url)
        .query(&[("grant_type", "password")])
        .json(&serde_json::json!({ "email": email, "password": password }));
    let response = client.authed(req).send().await?;

    match response.status().as_u16() {
        200..=299 => {}
        400 | 401 => {
            return Err(KitError::Validation("Invalid email or password".into()));
        }
        _ => return Err(KitError::from_response(response).await),
    }

    let token: TokenResponse = response.json().await?;
    let expires_at = token
        .expires_at
        .or_else(|| token.expires_in.map(|secs| chrono::Utc::now().timestamp() + secs));
    let session = StoredSession {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        email: token
            .user
            .and_then(|u| u.email)
            .unwrap_or_else(|| email.to_string()),
        expires_at,
    };
    info!(email = %session.email, "Signed in");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, MockResponse};

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("ana@kit.example", "secret1").is_ok());
        assert!(validate_credentials("", "secret1").is_err());
        assert!(validate_credentials("ana@kit", "secret1").is_err());
        assert!(validate_credentials("ana kit@x.io", "secret1").is_err());
        assert!(validate_credentials("ana@kit.example", "").is_err());
        assert!(validate_credentials("ana@kit.example", "12345").is_err());
    }

    #[tokio::test]
    async fn test_sign_in_returns_session() {
        let server = serve(vec![MockResponse::json(
            200,
            r#"{"access_token":"jwt-1","refresh_token":"r-1","expires_at":1900000000,"user":{"email":"ana@kit.example"}}"#,
        )]);
        let client = BackendClient::new(&server.url, "anon");
        let session = sign_in(&client, " ana@kit.example ", "secret1").await.unwrap();
        assert_eq!(session.access_token, "jwt-1");
        assert_eq!(session.refresh_token.as_deref(), Some("r-1"));
        assert_eq!(session.expires_at, Some(1_900_000_000));

        let reqs = server.requests();
        assert_eq!(reqs[0].url, "/auth/v1/token?grant_type=password");
        assert_eq!(reqs[0].body_json()["email"], "ana@kit.example");
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_validation_errors() {
        let server = serve(vec![MockResponse::json(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )]);
        let client = BackendClient::new(&server.url, "anon");
        let err = sign_in(&client, "ana@kit.example", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, KitError::Validation(_)));
    }
}
