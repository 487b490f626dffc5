use axum::{
    extract::{FromRequest, Request, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::ax_state::AppState;
use crate::models::context::{ChainInput, ChatRequest};

/// 聊天请求体提取器：先按 JSON 读取，再做字段级校验。
/// 任何一步失败都在进入 handler 之前返回，问答链不会被调用。
pub struct ChatPayload(pub ChatRequest);

impl<S> FromRequest<S> for ChatPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;

        ChatRequest::from_value(body)
            .map(ChatPayload)
            .map_err(ApiError::Validation)
    }
}

/// 处理聊天请求
pub async fn chat(
    State(state): State<Arc<AppState>>,
    ChatPayload(request): ChatPayload,
) -> ApiResult<Json<Value>> {
    info!(
        question = %request.question,
        history_turns = request.chat_history.len(),
        "收到聊天请求"
    );
    debug!(?request);

    let response = state.chain.invoke(ChainInput::from(request)).await?;

    info!(%response, "问答链返回结果");
    Ok(Json(response))
}
