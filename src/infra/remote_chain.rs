use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::chain::{AnswerChain, ChainError};
use crate::models::context::ChainInput;

/// 上游错误正文最多保留的字符数
const MAX_ERROR_BODY: usize = 512;

/// 通过 HTTP 调用部署在别处的问答链（LangServe `invoke` 约定）：
/// `POST {base}/invoke`，请求体 `{"input": {...}}`，响应体 `{"output": ..., "metadata": ...}`
pub struct RemoteChain {
    client: Client,
    invoke_url: Url,
}

#[derive(Serialize)]
struct InvokeEnvelope<'a> {
    input: &'a ChainInput,
}

impl RemoteChain {
    pub fn new(base_url: &Url) -> Result<Self, ChainError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &Url) -> Result<Self, ChainError> {
        // 保证 join 时不会吃掉基础路径的最后一段
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let invoke_url = base
            .join("invoke")
            .map_err(|e| ChainError::Other(format!("invalid chain url: {e}")))?;
        Ok(Self { client, invoke_url })
    }

    pub fn invoke_url(&self) -> &Url {
        &self.invoke_url
    }
}

#[async_trait]
impl AnswerChain for RemoteChain {
    #[instrument(skip(self, input), fields(url = %self.invoke_url))]
    async fn invoke(&self, input: ChainInput) -> Result<Value, ChainError> {
        let resp = self
            .client
            .post(self.invoke_url.clone())
            .json(&InvokeEnvelope { input: &input })
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(ChainError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| ChainError::Decode(e.to_string()))?;
        debug!(status = status.as_u16(), "问答链调用完成");

        Ok(unwrap_output(value))
    }
}

/// LangServe 把结果包在 `output` 里；没有这一层时原样返回
fn unwrap_output(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.contains_key("output") => {
            obj.remove("output").unwrap_or(Value::Null)
        }
        other => other,
    }
}
