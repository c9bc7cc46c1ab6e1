use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::PelotonClient;
use crate::config::Credentials;
use crate::response::{validate_transport, ApiOutcome};

const CONTEXT: &str = "user id retrieval";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username_or_email: &'a str,
    password: &'a str,
}

impl PelotonClient {
    /// POST the credentials to the auth endpoint. The session cookie lands in
    /// the client's cookie store for later calls.
    #[instrument(level = "info", skip_all, fields(user = %creds.username))]
    pub async fn login(&self, creds: &Credentials) -> ApiOutcome {
        let segments = self.api.auth_path.split('/').filter(|s| !s.is_empty());
        let url = match self.endpoint(segments, CONTEXT) {
            Ok(url) => url,
            Err(failure) => return ApiOutcome::Failure(failure),
        };
        let req = self.client.post(url).json(&LoginRequest {
            username_or_email: &creds.username,
            password: &creds.password,
        });
        validate_transport(self.send(req).await, CONTEXT)
    }

    /// Log in and return the account's user id.
    pub async fn get_user_id(&self, creds: &Credentials) -> Result<String> {
        let body = self.login(creds).await.into_result()?;
        let user_id = user_id_from_login(&body)?;
        info!(user_id = %user_id, "logged in");
        Ok(user_id)
    }
}

pub fn user_id_from_login(body: &Value) -> Result<String> {
    body.get("user_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{} failed: login response has no `user_id`", CONTEXT))
}
