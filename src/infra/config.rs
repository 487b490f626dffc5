use reqwest::Url;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CHAIN_URL: &str = "http://127.0.0.1:8000/chat";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_ADDR 无效 `{value}`: {reason}")]
    BindAddr { value: String, reason: String },

    #[error("CHAIN_URL 无效 `{value}`: {reason}")]
    ChainUrl { value: String, reason: String },
}

/// 服务配置
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// 监听地址，默认所有网卡的 8080 端口
    pub bind_addr: SocketAddr,
    /// 问答链服务的基础地址，请求发往 `{chain_url}/invoke`
    pub chain_url: Url,
}

impl AppConfig {
    /// 从环境变量读取配置（调用前先加载 `.env`）。
    ///
    /// | 变量         | 默认值                        |
    /// |--------------|-------------------------------|
    /// | `BIND_ADDR`  | `0.0.0.0:8080`                |
    /// | `CHAIN_URL`  | `http://127.0.0.1:8000/chat`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::BindAddr {
                value: bind.clone(),
                reason: e.to_string(),
            })?;

        let chain = lookup("CHAIN_URL").unwrap_or_else(|| DEFAULT_CHAIN_URL.into());
        let chain_url = Url::parse(chain.trim()).map_err(|e| ConfigError::ChainUrl {
            value: chain.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(chain_url.scheme(), "http" | "https") {
            return Err(ConfigError::ChainUrl {
                value: chain,
                reason: "scheme must be http or https".into(),
            });
        }

        Ok(Self {
            bind_addr,
            chain_url,
        })
    }
}
