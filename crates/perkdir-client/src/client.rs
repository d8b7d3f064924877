use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::listing::{parse_listing, parse_perk_record};
use crate::types::{PerkDescriptor, PerkRecord, RegisterRequest, RegisteredSession};

/// Thin HTTP client bound to one API base URL. Owns the bearer token issued
/// at registration and attaches it to every subsequent call.
#[derive(Debug, Clone)]
pub struct RemoteSessionClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl RemoteSessionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            bearer_token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub fn authenticate(&mut self, token: impl Into<String>) {
        self.bearer_token = Some(token.into());
    }

    /// Registers a fresh identity and stores its bearer token. A response
    /// without a usable token is an error: nothing downstream can run
    /// unauthenticated.
    pub async fn register(&mut self, request: &RegisterRequest) -> ClientResult<RegisteredSession> {
        let value = self
            .execute_json(
                self.http.post(self.endpoint("/auth/register")).json(request),
                "registration",
            )
            .await?;

        let token = value
            .get("token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if token.is_empty() {
            return Err(ClientError::Protocol(
                "registration response did not contain a usable bearer token".to_owned(),
            ));
        }
        let user = value
            .get("user")
            .cloned()
            .and_then(|user| serde_json::from_value(user).ok());

        self.bearer_token = Some(token.clone());
        Ok(RegisteredSession { token, user })
    }

    pub async fn create_perk(&self, descriptor: &PerkDescriptor) -> ClientResult<PerkRecord> {
        let value = self
            .execute_json(
                self.authorized(self.http.post(self.endpoint("/perks")))
                    .json(descriptor),
                "perk creation",
            )
            .await?;
        parse_perk_record(&value).ok_or_else(|| {
            ClientError::Protocol(format!(
                "perk creation response had an unsupported shape: {}",
                sanitize_error_body(&value.to_string())
            ))
        })
    }

    /// Unfiltered listing with the full shape-tolerance ladder: the primary
    /// endpoint under each known shape, then the secondary `/perks/all`
    /// endpoint. A shape mismatch that survives the ladder is a protocol
    /// error, never a silent empty sequence.
    pub async fn list_perks(&self) -> ClientResult<Vec<PerkRecord>> {
        let value = self
            .execute_json(
                self.authorized(self.http.get(self.endpoint("/perks"))),
                "perk listing",
            )
            .await?;
        if let Some(records) = parse_listing(&value) {
            return Ok(records);
        }

        tracing::warn!("primary perk listing had an unknown shape, trying the fallback endpoint");
        let value = self
            .execute_json(
                self.authorized(self.http.get(self.endpoint("/perks/all"))),
                "perk listing fallback",
            )
            .await?;
        parse_listing(&value).ok_or_else(|| {
            ClientError::Protocol(format!(
                "perk listing shape mismatch persisted across both endpoints: {}",
                sanitize_error_body(&value.to_string())
            ))
        })
    }

    /// Filtered listing for the directory page. Filters ride as query
    /// parameters and compose server-side; the fallback endpoint cannot carry
    /// them, so a shape mismatch here fails outright.
    pub async fn search_perks(
        &self,
        name: Option<&str>,
        merchant: Option<&str>,
    ) -> ClientResult<Vec<PerkRecord>> {
        let mut request = self.authorized(self.http.get(self.endpoint("/perks")));
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(name) = name {
            params.push(("name", name));
        }
        if let Some(merchant) = merchant {
            params.push(("merchant", merchant));
        }
        if !params.is_empty() {
            request = request.query(&params);
        }

        let value = self.execute_json(request, "perk search").await?;
        parse_listing(&value).ok_or_else(|| {
            ClientError::Protocol(format!(
                "perk search response had an unsupported shape: {}",
                sanitize_error_body(&value.to_string())
            ))
        })
    }

    pub async fn delete_perk(&self, id: &str) -> ClientResult<()> {
        let response = self
            .authorized(self.http.delete(self.endpoint(&format!("/perks/{id}"))))
            .send()
            .await
            .map_err(|error| {
                ClientError::Transport(format!("perk delete request failed: {error}"))
            })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = sanitize_error_body(&response.text().await.unwrap_or_default());
            Err(ClientError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.bearer_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute_json(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> ClientResult<Value> {
        let response = request.send().await.map_err(|error| {
            ClientError::Transport(format!("{operation} request failed: {error}"))
        })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let body = sanitize_error_body(&response.text().await.unwrap_or_default());
            return Err(ClientError::Conflict(format!(
                "{operation} rejected as already existing: {body}"
            )));
        }
        if !status.is_success() {
            let body = sanitize_error_body(&response.text().await.unwrap_or_default());
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|error| {
            ClientError::Transport(format!("{operation} response body read failed: {error}"))
        })?;
        serde_json::from_str(&body).map_err(|_| {
            ClientError::Protocol(format!(
                "{operation} response was not JSON: {}",
                sanitize_error_body(&body)
            ))
        })
    }
}

fn sanitize_error_body(body: &str) -> String {
    let flattened = body
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect::<String>();
    let flattened = flattened.split_whitespace().collect::<Vec<_>>().join(" ");

    const MAX_LEN: usize = 200;
    match flattened.char_indices().nth(MAX_LEN) {
        Some((cut, _)) => format!("{}...", &flattened[..cut]),
        None => flattened,
    }
}
