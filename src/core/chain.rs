use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::context::ChainInput;

/// 问答链调用失败的原因
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain transport failed: {0}")]
    Transport(String),

    #[error("chain returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("chain response could not be decoded: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// 外部问答链（检索、提示词、模型编排都在链内部完成）。
///
/// 实现需要支持并发调用：同一个实例会被多个请求同时使用。
/// 返回值是任意 JSON，处理层不解释、不校验、不改写。
#[async_trait]
pub trait AnswerChain: Send + Sync {
    async fn invoke(&self, input: ChainInput) -> Result<Value, ChainError>;
}
