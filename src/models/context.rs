use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// 单轮历史对话，例如 `{"human": "...", "ai": "..."}`。
/// 键值原样透传给问答链，这里不解释角色含义。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTurn(pub BTreeMap<String, String>);

impl ChatTurn {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ChatTurn {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String, // 用户提问内容
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

/// 交给问答链的结构化参数，字段名固定为 question / chat_history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainInput {
    pub question: String,
    pub chat_history: Vec<ChatTurn>,
}

impl From<ChatRequest> for ChainInput {
    fn from(req: ChatRequest) -> Self {
        Self {
            question: req.question,
            chat_history: req.chat_history,
        }
    }
}

/// 字段级校验错误，`loc` 指向出错位置，如 `["body", "question"]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl FieldError {
    fn new(loc: Vec<Value>, msg: impl Into<String>, kind: &'static str) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind,
        }
    }
}

impl ChatRequest {
    /// 从任意 JSON 值解析请求，一次性收集所有字段错误。
    /// `chat_history` 缺省或为 null 时视为空列表。
    pub fn from_value(body: Value) -> Result<Self, Vec<FieldError>> {
        let mut obj = match body {
            Value::Object(obj) => obj,
            _ => {
                return Err(vec![FieldError::new(
                    vec![json!("body")],
                    "Input should be a valid dictionary",
                    "object_type",
                )])
            }
        };

        let mut errors = Vec::new();

        let question = match obj.remove("question") {
            None | Some(Value::Null) => {
                errors.push(FieldError::new(
                    vec![json!("body"), json!("question")],
                    "Field required",
                    "missing",
                ));
                None
            }
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                errors.push(FieldError::new(
                    vec![json!("body"), json!("question")],
                    "Input should be a valid string",
                    "string_type",
                ));
                None
            }
        };

        let chat_history = match obj.remove("chat_history") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => parse_history(items, &mut errors),
            Some(_) => {
                errors.push(FieldError::new(
                    vec![json!("body"), json!("chat_history")],
                    "Input should be a valid list",
                    "list_type",
                ));
                Vec::new()
            }
        };

        match question {
            Some(question) if errors.is_empty() => Ok(Self {
                question,
                chat_history,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_history(items: Vec<Value>, errors: &mut Vec<FieldError>) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let entries: Map<String, Value> = match item {
            Value::Object(m) => m,
            _ => {
                errors.push(FieldError::new(
                    vec![json!("body"), json!("chat_history"), json!(idx)],
                    "Input should be a valid dictionary",
                    "dict_type",
                ));
                continue;
            }
        };

        let mut turn = BTreeMap::new();
        for (key, value) in entries {
            match value {
                Value::String(s) => {
                    turn.insert(key, s);
                }
                _ => errors.push(FieldError::new(
                    vec![json!("body"), json!("chat_history"), json!(idx), json!(key)],
                    "Input should be a valid string",
                    "string_type",
                )),
            }
        }
        turns.push(ChatTurn(turn));
    }
    turns
}
