//! Client for the hosted relational backend
//!
//! Talks to a PostgREST-style API (`/rest/v1/<table>`) over HTTPS. Tables:
//! - `cases`   - kit narratives
//! - `modules` - printable documents of a case, content stored as an envelope string
//! - `codes`   - activation codes
//! - `agents`  - AI chat personas
//!
//! No caching and no concurrency control: each call is one request, and the
//! last write to land wins.

pub mod auth;
pub mod models;
pub mod storage;

pub use models::*;

use crate::error::{KitError, Result};
use crate::settings;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BackendClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("casekit/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
            http,
        }
    }

    /// Act as a signed-in user instead of the anonymous role.
    pub fn with_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Build a client from stored settings, using the saved session when there is one.
    pub fn from_settings() -> Result<Self> {
        let url = settings::get_backend_url().ok_or(KitError::MissingConfig("backend-url"))?;
        let key = settings::get_anon_key().ok_or(KitError::MissingConfig("anon-key"))?;
        let client = Self::new(&url, &key);
        Ok(match settings::get_session() {
            Some(session) => client.with_token(&session.access_token),
            None => client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Attach the project key and bearer token every hosted endpoint expects.
    pub(crate) fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        req.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = self.authed(req).send().await?;
        if !response.status().is_success() {
            return Err(KitError::from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn execute(&self, req: RequestBuilder) -> Result<()> {
        let response = self.authed(req).send().await?;
        if !response.status().is_success() {
            return Err(KitError::from_response(response).await);
        }
        Ok(())
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<Vec<T>> {
        debug!(table, "insert");
        let req = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        self.fetch(req).await
    }

    async fn patch<B: Serialize + ?Sized>(&self, table: &str, id: &str, body: &B) -> Result<()> {
        debug!(table, id, "patch");
        let req = self
            .http
            .patch(self.rest_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .json(body);
        self.execute(req).await
    }

    async fn delete_row(&self, table: &str, id: &str) -> Result<()> {
        debug!(table, id, "delete");
        let req = self
            .http
            .delete(self.rest_url(table))
            .query(&[("id", format!("eq.{}", id))]);
        self.execute(req).await
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<T> {
        let req = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        let mut rows: Vec<T> = self.fetch(req).await?;
        if rows.is_empty() {
            return Err(KitError::NotFound(format!("{} {}", table, id)));
        }
        Ok(rows.swap_remove(0))
    }

    // ==================== Cases ====================

    /// All cases, newest first
    pub async fn list_cases(&self) -> Result<Vec<Case>> {
        let req = self
            .http
            .get(self.rest_url("cases"))
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.fetch(req).await
    }

    pub async fn create_case(&self, case: &NewCase) -> Result<Case> {
        if case.title.trim().is_empty() {
            return Err(KitError::Validation("Case title is required".into()));
        }
        let mut rows: Vec<Case> = self.insert("cases", case).await?;
        rows.pop()
            .ok_or_else(|| KitError::Custom("Backend returned no row for new case".into()))
    }

    pub async fn delete_case(&self, id: &str) -> Result<()> {
        self.delete_row("cases", id).await
    }

    // ==================== Modules ====================

    /// Modules of one case in kit order
    pub async fn list_modules(&self, case_id: &str) -> Result<Vec<Module>> {
        let req = self.http.get(self.rest_url("modules")).query(&[
            ("select", "*".to_string()),
            ("case_id", format!("eq.{}", case_id)),
            ("order", "sort_order.asc".to_string()),
        ]);
        self.fetch(req).await
    }

    pub async fn get_module(&self, id: &str) -> Result<Module> {
        self.select_one("modules", id).await
    }

    pub async fn create_module(&self, module: &NewModule) -> Result<Module> {
        let mut rows: Vec<Module> = self.insert("modules", module).await?;
        rows.pop()
            .ok_or_else(|| KitError::Custom("Backend returned no row for new module".into()))
    }

    /// Write the editor's title and serialized envelope back to the row.
    pub async fn update_module_content(&self, id: &str, title: &str, content: &str) -> Result<()> {
        self.patch(
            "modules",
            id,
            &serde_json::json!({ "title": title, "content": content }),
        )
        .await
    }

    pub async fn update_module_status(&self, id: &str, status: ModuleStatus) -> Result<()> {
        self.patch("modules", id, &serde_json::json!({ "status": status })).await
    }

    pub async fn update_module_order(&self, id: &str, sort_order: i32) -> Result<()> {
        self.patch("modules", id, &serde_json::json!({ "sort_order": sort_order })).await
    }

    pub async fn delete_module(&self, id: &str) -> Result<()> {
        self.delete_row("modules", id).await
    }

    // ==================== Codes ====================

    /// All activation codes, newest first
    pub async fn list_codes(&self) -> Result<Vec<Code>> {
        let req = self
            .http
            .get(self.rest_url("codes"))
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        self.fetch(req).await
    }

    /// Insert a batch in a single request and return the stored rows.
    pub async fn insert_codes(&self, codes: &[NewCode]) -> Result<Vec<Code>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        self.insert("codes", codes).await
    }

    // ==================== Agents ====================

    /// All agents ordered by name
    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        let req = self
            .http
            .get(self.rest_url("agents"))
            .query(&[("select", "*"), ("order", "name")]);
        self.fetch(req).await
    }

    pub async fn get_agent(&self, id: &str) -> Result<Agent> {
        self.select_one("agents", id).await
    }

    pub async fn update_agent(&self, id: &str, update: &AgentUpdate) -> Result<()> {
        self.patch("agents", id, update).await
    }
}
