use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::models::ContentKind;

/// A signed-in user. Every table call is scoped to `user_id` and carries the
/// access token so the backend's row policies apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationPending { user_id: Option<String> },
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `Ok(None)` when the backend rejects the credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;
    /// Owner id for a token, `Ok(None)` when the token is invalid or expired.
    async fn current_user(&self, access_token: &str) -> Result<Option<String>>;
    /// Owner's rows, newest first.
    async fn select(&self, session: &Session, kind: ContentKind) -> Result<Vec<Value>>;
    async fn insert(
        &self,
        session: &Session,
        kind: ContentKind,
        rows: Vec<Map<String, Value>>,
    ) -> Result<()>;
    /// `Ok(false)` when no row of the owner has that id.
    async fn update(
        &self,
        session: &Session,
        kind: ContentKind,
        id: &str,
        row: Map<String, Value>,
    ) -> Result<bool>;
    async fn delete(&self, session: &Session, kind: ContentKind, id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

impl SupabaseClient {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn table_url(&self, kind: ContentKind) -> String {
        format!("{}/rest/v1/{}", self.url, kind.table())
    }

    fn authed(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
        req.header("apikey", &self.anon_key).bearer_auth(token)
    }

    fn owned_row_filter(session: &Session, id: &str) -> String {
        format!(
            "id=eq.{}&user_id=eq.{}",
            urlencoding::encode(id),
            urlencoding::encode(&session.user_id)
        )
    }
}

async fn check(res: Response, what: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(anyhow!("{} failed. Status: {}, Response: {}", what, status, body))
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}

#[async_trait]
impl BackendApi for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Supabase sign-in request failed")?;
        if is_rejection(res.status()) {
            debug!("Sign-in rejected with status {}", res.status());
            return Ok(None);
        }
        let token: TokenResponse = check(res, "Supabase sign-in")
            .await?
            .json()
            .await
            .context("Failed to parse Supabase token response")?;
        Ok(Some(Session {
            access_token: token.access_token,
            user_id: token.user.id,
        }))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let url = format!("{}/auth/v1/signup", self.url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Supabase sign-up request failed")?;
        let body: Value = check(res, "Supabase sign-up")
            .await?
            .json()
            .await
            .context("Failed to parse Supabase sign-up response")?;

        // With email confirmation on, the backend returns the bare user.
        if let Ok(token) = serde_json::from_value::<TokenResponse>(body.clone()) {
            return Ok(SignUpOutcome::SignedIn(Session {
                access_token: token.access_token,
                user_id: token.user.id,
            }));
        }
        let user_id = body
            .get("user")
            .and_then(|u| u.get("id"))
            .or_else(|| body.get("id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Ok(SignUpOutcome::ConfirmationPending { user_id })
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<String>> {
        let url = format!("{}/auth/v1/user", self.url);
        let res = self
            .authed(self.client.get(&url), access_token)
            .send()
            .await
            .context("Supabase user lookup failed")?;
        if is_rejection(res.status()) {
            return Ok(None);
        }
        let user: AuthUser = check(res, "Supabase user lookup")
            .await?
            .json()
            .await
            .context("Failed to parse Supabase user")?;
        Ok(Some(user.id))
    }

    async fn select(&self, session: &Session, kind: ContentKind) -> Result<Vec<Value>> {
        let url = format!(
            "{}?select=*&user_id=eq.{}&order=created_at.desc",
            self.table_url(kind),
            urlencoding::encode(&session.user_id)
        );
        let res = self
            .authed(self.client.get(&url), &session.access_token)
            .send()
            .await
            .with_context(|| format!("Supabase select on {} failed", kind.table()))?;
        let rows: Vec<Value> = check(res, &format!("Select from {}", kind.table()))
            .await?
            .json()
            .await
            .context("Failed to parse Supabase rows")?;
        Ok(rows)
    }

    async fn insert(
        &self,
        session: &Session,
        kind: ContentKind,
        rows: Vec<Map<String, Value>>,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let res = self
            .authed(self.client.post(self.table_url(kind)), &session.access_token)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .with_context(|| format!("Supabase insert into {} failed", kind.table()))?;
        check(res, &format!("Insert into {}", kind.table())).await?;
        Ok(())
    }

    async fn update(
        &self,
        session: &Session,
        kind: ContentKind,
        id: &str,
        row: Map<String, Value>,
    ) -> Result<bool> {
        let url = format!(
            "{}?{}",
            self.table_url(kind),
            Self::owned_row_filter(session, id)
        );
        // PostgREST answers 2xx even when the filter matched nothing.
        let res = self
            .authed(self.client.patch(&url), &session.access_token)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .with_context(|| format!("Supabase update on {} failed", kind.table()))?;
        let updated: Vec<Value> = check(res, &format!("Update {} {}", kind.table(), id))
            .await?
            .json()
            .await
            .context("Failed to parse Supabase update response")?;
        Ok(!updated.is_empty())
    }

    async fn delete(&self, session: &Session, kind: ContentKind, id: &str) -> Result<()> {
        let url = format!(
            "{}?{}",
            self.table_url(kind),
            Self::owned_row_filter(session, id)
        );
        let res = self
            .authed(self.client.delete(&url), &session.access_token)
            .send()
            .await
            .with_context(|| format!("Supabase delete on {} failed", kind.table()))?;
        check(res, &format!("Delete {} {}", kind.table(), id)).await?;
        Ok(())
    }
}
