use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OPC 规定的“好质量”下限（含）。
pub const QUALITY_GOOD: u16 = 192;

/// 样本值的数据类型。
///
/// 相等比较是精确比较（`F64` 按位值比较，不做容差）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// 带时间戳和质量码的样本。
///
/// 由实时读取、历史读取和订阅推送产生，构造后不可变。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub tag: String,
    pub value: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub quality: u16,
}

impl DataPoint {
    pub fn new(
        tag: impl Into<String>,
        value: Option<Value>,
        timestamp: DateTime<Utc>,
        quality: u16,
    ) -> Self {
        Self {
            tag: tag.into(),
            value,
            timestamp,
            quality,
        }
    }

    /// 质量码 >= 192 视为好质量。
    pub fn is_good(&self) -> bool {
        self.quality >= QUALITY_GOOD
    }
}

/// 写入请求中的一个标签/值对（保持调用方给出的顺序）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagValue {
    pub tag: String,
    pub value: Value,
}

impl TagValue {
    pub fn new(tag: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}
