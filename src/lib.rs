pub mod api;
pub mod core;
pub mod infra;
pub mod models;

use axum::{
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::chat::chat;
use crate::infra::telemetry;

pub mod ax_state {
    use super::*;
    use crate::core::chain::AnswerChain;

    /// 每个请求共享的只读状态，请求之间没有可变共享数据
    pub struct AppState {
        pub chain: Arc<dyn AnswerChain>,
    }
}

pub use ax_state::AppState;

/// 跨域策略：任意来源、任意方法、任意请求头，允许携带凭证。
///
/// 浏览器不接受 `*` 与凭证同时出现，所以来源、方法、请求头都按请求回显，
/// 暴露的响应头列出本服务实际会返回的那些。
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([CONTENT_TYPE, CONTENT_LENGTH, telemetry::X_REQUEST_ID])
}

/// 组装路由，应用对象只在入口处构造一次并交给 `axum::serve`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http().make_span_with(telemetry::make_request_span))
        .layer(middleware::from_fn(telemetry::assign_request_id))
        .layer(cors_layer())
}
