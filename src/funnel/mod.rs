//! Funnel progression engine: the cached per-account funnel snapshot,
//! idempotent delivery records, and the pending-message existence probe.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use diesel::prelude::*;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::shared::error::ApiError;
use crate::shared::models::{
    Account, ApiResponse, ConversationFunnel, FunnelStep, FunnelStepMessage, SentStepMessage,
    UserSession,
};
use crate::shared::schema::{
    accounts, conversation_funnels, funnel_step_messages, funnel_steps, sent_step_messages,
    user_sessions,
};
use crate::shared::state::AppState;

/// Funnel structure changes rarely; five minutes keeps the hot messaging
/// paths off the database.
const FUNNEL_CACHE_TTL_SECS: u64 = 300;

pub fn funnel_cache_key(account_id: i64) -> String {
    format!("account-funnel:{}", account_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStepWithMessages {
    #[serde(flatten)]
    pub step: FunnelStep,
    pub messages: Vec<FunnelStepMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFunnelData {
    pub account: Account,
    pub conversation_funnel: Option<ConversationFunnel>,
    pub steps: Vec<FunnelStepWithMessages>,
}

/// Nests each step's messages under it, messages ordered by shipping order.
/// `messages` must be sorted by `(funnel_step_id, shipping_order)` ascending,
/// which the caller's query guarantees.
pub fn group_step_messages(
    steps: Vec<FunnelStep>,
    messages: Vec<FunnelStepMessage>,
) -> Vec<FunnelStepWithMessages> {
    steps
        .into_iter()
        .map(|step| {
            let step_messages = messages
                .iter()
                .filter(|m| m.funnel_step_id == step.id)
                .cloned()
                .collect();
            FunnelStepWithMessages {
                step,
                messages: step_messages,
            }
        })
        .collect()
}

fn load_account_funnel_data(
    conn: &mut PgConnection,
    account_id: i64,
) -> Result<AccountFunnelData, ApiError> {
    let account: Account = accounts::table
        .find(account_id)
        .select(Account::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("no account with id {}", account_id)))?;

    let Some(funnel_id) = account.funnel_id else {
        // An account without a funnel is a valid state, not an error.
        return Ok(AccountFunnelData {
            account,
            conversation_funnel: None,
            steps: Vec::new(),
        });
    };

    let funnel: Option<ConversationFunnel> = conversation_funnels::table
        .find(funnel_id)
        .select(ConversationFunnel::as_select())
        .first(conn)
        .optional()?;

    let Some(funnel) = funnel else {
        return Ok(AccountFunnelData {
            account,
            conversation_funnel: None,
            steps: Vec::new(),
        });
    };

    let steps: Vec<FunnelStep> = funnel_steps::table
        .filter(funnel_steps::funnel_id.eq(funnel.id))
        .order(funnel_steps::step_order.asc())
        .select(FunnelStep::as_select())
        .load(conn)?;

    let step_ids: Vec<i64> = steps.iter().map(|s| s.id).collect();
    let messages: Vec<FunnelStepMessage> = funnel_step_messages::table
        .filter(funnel_step_messages::funnel_step_id.eq_any(&step_ids))
        .order((
            funnel_step_messages::funnel_step_id.asc(),
            funnel_step_messages::shipping_order.asc(),
        ))
        .select(FunnelStepMessage::as_select())
        .load(conn)?;

    Ok(AccountFunnelData {
        account,
        conversation_funnel: Some(funnel),
        steps: group_step_messages(steps, messages),
    })
}

/// Read-through cached funnel snapshot for one account. Cache trouble never
/// fails the request; it degrades to a direct database read.
pub async fn get_account_funnel_data(
    state: &AppState,
    account_id: i64,
) -> Result<AccountFunnelData, ApiError> {
    let cache_key = funnel_cache_key(account_id);

    if let Some(client) = &state.cache {
        if let Ok(mut conn) = client.get_multiplexed_async_connection().await {
            if let Ok(cached_json) = conn.get::<_, String>(&cache_key).await {
                if let Ok(cached) = serde_json::from_str::<AccountFunnelData>(&cached_json) {
                    debug!("funnel cache hit for account {}", account_id);
                    return Ok(cached);
                }
            }
        }
    }

    let data = {
        let mut conn = state.db()?;
        load_account_funnel_data(&mut conn, account_id)?
    };

    if let Some(client) = &state.cache {
        match client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                let json = serde_json::to_string(&data).unwrap_or_default();
                if let Err(e) = conn
                    .set_ex::<_, _, ()>(&cache_key, json, FUNNEL_CACHE_TTL_SECS)
                    .await
                {
                    debug!("failed to populate funnel cache: {}", e);
                }
            }
            Err(e) => debug!("cache unavailable, skipping populate: {}", e),
        }
    }

    Ok(data)
}

/// Records that a step message was sent to a session. Idempotent: a repeat
/// registration returns the original record untouched. Returns
/// `(record, created)`.
pub fn register_sent_message(
    conn: &mut PgConnection,
    step_message_id: i64,
    session_id: i64,
) -> Result<(SentStepMessage, bool), ApiError> {
    let session: UserSession = user_sessions::table
        .find(session_id)
        .select(UserSession::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("no session with id {}", session_id)))?;

    let message: FunnelStepMessage = funnel_step_messages::table
        .find(step_message_id)
        .select(FunnelStepMessage::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no step message with id {}", step_message_id))
        })?;

    // A delivery must stay inside the session's own funnel.
    let account: Account = accounts::table
        .find(session.account_id)
        .select(Account::as_select())
        .first(conn)?;
    let step: FunnelStep = funnel_steps::table
        .find(message.funnel_step_id)
        .select(FunnelStep::as_select())
        .first(conn)?;
    if account.funnel_id != Some(step.funnel_id) {
        return Err(ApiError::Validation(format!(
            "step message {} does not belong to the funnel of account {}",
            step_message_id, session.account_id
        )));
    }

    let existing: Option<SentStepMessage> = sent_step_messages::table
        .filter(sent_step_messages::user_session_id.eq(session_id))
        .filter(sent_step_messages::funnel_step_message_id.eq(step_message_id))
        .select(SentStepMessage::as_select())
        .first(conn)
        .optional()?;
    if let Some(record) = existing {
        return Ok((record, false));
    }

    let inserted: Option<SentStepMessage> = diesel::insert_into(sent_step_messages::table)
        .values((
            sent_step_messages::user_session_id.eq(session_id),
            sent_step_messages::funnel_step_message_id.eq(step_message_id),
            sent_step_messages::sent_at.eq(chrono::Utc::now()),
        ))
        .on_conflict((
            sent_step_messages::user_session_id,
            sent_step_messages::funnel_step_message_id,
        ))
        .do_nothing()
        .get_result(conn)
        .optional()?;

    match inserted {
        Some(record) => {
            info!(
                "registered delivery of message {} to session {}",
                step_message_id, session_id
            );
            Ok((record, true))
        }
        None => {
            // Lost the race to a concurrent registration; return the winner.
            let winner: SentStepMessage = sent_step_messages::table
                .filter(sent_step_messages::user_session_id.eq(session_id))
                .filter(sent_step_messages::funnel_step_message_id.eq(step_message_id))
                .select(SentStepMessage::as_select())
                .first(conn)?;
            Ok((winner, false))
        }
    }
}

/// Existence probe used by non-critical polling paths. Unknown ids are
/// simply "not sent", never an error.
pub fn check_message_sent(
    conn: &mut PgConnection,
    step_message_id: i64,
    session_id: i64,
) -> bool {
    sent_step_messages::table
        .filter(sent_step_messages::user_session_id.eq(session_id))
        .filter(sent_step_messages::funnel_step_message_id.eq(step_message_id))
        .count()
        .get_result::<i64>(conn)
        .map(|n| n > 0)
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
pub struct RegisterSentMessageRequest {
    #[serde(alias = "conversationFunnelStepMessageId")]
    pub conversation_funnel_step_message_id: Option<i64>,
    #[serde(alias = "userSessionId")]
    pub user_session_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckSentQuery {
    #[serde(alias = "conversationFunnelStepMessageId")]
    pub conversation_funnel_step_message_id: i64,
    #[serde(alias = "userSessionId")]
    pub user_session_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckSentResponse {
    pub sent: bool,
}

pub async fn get_account_funnel(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i64>,
) -> Result<Json<ApiResponse<AccountFunnelData>>, ApiError> {
    let data = get_account_funnel_data(&state, account_id).await?;
    Ok(Json(ApiResponse::success(data)))
}

pub async fn register_sent_message_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterSentMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SentStepMessage>>), ApiError> {
    let step_message_id = req.conversation_funnel_step_message_id.ok_or_else(|| {
        ApiError::Validation("conversation_funnel_step_message_id is required".to_string())
    })?;
    let session_id = req
        .user_session_id
        .ok_or_else(|| ApiError::Validation("user_session_id is required".to_string()))?;

    let mut conn = state.db()?;
    let (record, created) = register_sent_message(&mut conn, step_message_id, session_id)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(record))))
}

pub async fn check_message_sent_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckSentQuery>,
) -> Result<Json<ApiResponse<CheckSentResponse>>, ApiError> {
    let mut conn = state.db()?;
    let sent = check_message_sent(
        &mut conn,
        query.conversation_funnel_step_message_id,
        query.user_session_id,
    );
    Ok(Json(ApiResponse::success(CheckSentResponse { sent })))
}

pub fn configure_funnel_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/accounts/:account_id/funnel", get(get_account_funnel))
        .route("/api/funnel/sent-messages", post(register_sent_message_handler))
        .route("/api/funnel/sent-messages/check", get(check_message_sent_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn step(id: i64, order: i32) -> FunnelStep {
        FunnelStep {
            id,
            funnel_id: 1,
            name: format!("step-{}", id),
            is_first: order == 0,
            step_order: order,
            assign_to_team: false,
            kanban_code: None,
        }
    }

    fn message(id: i64, step_id: i64, shipping_order: i32) -> FunnelStepMessage {
        FunnelStepMessage {
            id,
            funnel_step_id: step_id,
            name: format!("msg-{}", id),
            content: "hello".to_string(),
            shipping_time: 0,
            shipping_order,
        }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(funnel_cache_key(42), "account-funnel:42");
    }

    #[test]
    fn test_group_step_messages_nests_by_step() {
        let steps = vec![step(1, 0), step(2, 1)];
        let messages = vec![message(10, 1, 0), message(11, 1, 1), message(20, 2, 0)];

        let grouped = group_step_messages(steps, messages);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].messages.len(), 2);
        assert_eq!(grouped[0].messages[0].id, 10);
        assert_eq!(grouped[0].messages[1].id, 11);
        assert_eq!(grouped[1].messages.len(), 1);
        assert_eq!(grouped[1].messages[0].id, 20);
    }

    #[test]
    fn test_group_step_messages_empty_step() {
        let grouped = group_step_messages(vec![step(1, 0)], vec![]);
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].messages.is_empty());
    }

    #[test]
    fn test_funnel_snapshot_round_trips_through_cache_encoding() {
        let now = Utc::now();
        let data = AccountFunnelData {
            account: Account {
                id: 7,
                product_id: 3,
                name: "Acme".to_string(),
                email: "ops@acme.io".to_string(),
                phone: "+5511999990000".to_string(),
                domain: Some("acme".to_string()),
                document: None,
                funnel_id: Some(1),
                created_at: now,
                updated_at: now,
            },
            conversation_funnel: Some(ConversationFunnel {
                id: 1,
                name: "default".to_string(),
                is_default: true,
                auto_assign: false,
                created_at: now,
            }),
            steps: group_step_messages(vec![step(1, 0)], vec![message(10, 1, 0)]),
        };

        let json = serde_json::to_string(&data).unwrap();
        let back: AccountFunnelData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.account.id, 7);
        assert_eq!(back.conversation_funnel.as_ref().unwrap().id, 1);
        assert_eq!(back.steps[0].messages[0].id, 10);
    }
}
