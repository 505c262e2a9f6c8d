//! Thin proxies to the external helpdesk/chat system. Conversation payloads
//! pass through unchanged; this service only adds routing and credentials.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::HelpdeskConfig;
use crate::shared::error::ApiError;
use crate::shared::models::ApiResponse;
use crate::shared::state::AppState;

pub struct HelpdeskClient<'a> {
    http: &'a reqwest::Client,
    config: &'a HelpdeskConfig,
}

impl<'a> HelpdeskClient<'a> {
    pub fn new(http: &'a reqwest::Client, config: &'a HelpdeskConfig) -> Self {
        Self { http, config }
    }

    fn conversation_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/api/v1/conversations/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            conversation_id
        )
    }

    pub async fn list_messages(&self, conversation_id: &str) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.conversation_url(conversation_id))
            .header("api_access_token", &self.config.api_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("helpdesk list returned {} for {}", status, conversation_id);
            return Err(ApiError::Upstream(format!(
                "helpdesk responded with status {}",
                status
            )));
        }

        Ok(response.json().await?)
    }

    pub async fn post_message(
        &self,
        conversation_id: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let response = self
            .http
            .post(self.conversation_url(conversation_id))
            .header("api_access_token", &self.config.api_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("helpdesk post returned {} for {}", status, conversation_id);
            return Err(ApiError::Upstream(format!(
                "helpdesk responded with status {}",
                status
            )));
        }

        Ok(response.json().await?)
    }
}

pub async fn list_conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let client = HelpdeskClient::new(&state.http, &state.config.helpdesk);
    let messages = client.list_messages(&conversation_id).await?;
    Ok(Json(ApiResponse::success(messages)))
}

pub async fn post_conversation_message(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let client = HelpdeskClient::new(&state.http, &state.config.helpdesk);
    let created = client.post_message(&conversation_id, &body).await?;
    Ok(Json(ApiResponse::success(created)))
}

pub fn configure_helpdesk_api_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/helpdesk/conversations/:conversation_id/messages",
        get(list_conversation_messages).post(post_conversation_message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_url_trims_trailing_slash() {
        let http = reqwest::Client::new();
        let config = HelpdeskConfig {
            base_url: "https://helpdesk.autonomia.site/".to_string(),
            api_token: "tok".to_string(),
        };
        let client = HelpdeskClient::new(&http, &config);
        assert_eq!(
            client.conversation_url("abc-1"),
            "https://helpdesk.autonomia.site/api/v1/conversations/abc-1/messages"
        );
    }
}
