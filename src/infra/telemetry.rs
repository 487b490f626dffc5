use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub const DEFAULT_FILTER: &str = "info,chat_backend=debug,tower_http=info";

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// 初始化日志，`RUST_LOG` 未设置时使用 [`DEFAULT_FILTER`]
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();
}

/// 请求 ID，写入请求扩展并回写到 `x-request-id` 响应头
#[derive(Clone, Copy, Debug)]
pub struct RequestId(pub Uuid);

/// 中间件：为每个请求分配 ID
pub async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    req.extensions_mut().insert(RequestId(id));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        res.headers_mut().insert(X_REQUEST_ID, value);
    }
    res
}

/// TraceLayer 的 span 构造函数，带上 request_id
pub fn make_request_span(request: &Request) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0)
        .unwrap_or_else(Uuid::new_v4);
    tracing::info_span!(
        "http_request",
        %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}
