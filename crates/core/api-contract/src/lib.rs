//! 稳定的 DTO 与 API 响应契约。
//!
//! 时间戳统一使用 Unix 毫秒，样本值使用 JSON 原生类型（bool / 整数 / 浮点 / 字符串）。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 连接状态。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub client_name: String,
    pub da_url: String,
    pub da_connected: bool,
    pub hda_url: String,
    pub hda_connected: bool,
    pub subscriptions: usize,
}

/// 批量读取请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub tags: Vec<String>,
}

/// 单个样本。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointDto {
    pub tag: String,
    pub value: Option<serde_json::Value>,
    pub ts_ms: i64,
    pub quality: u16,
    pub good: bool,
}

/// 逐项操作结果。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeDto {
    pub item_name: String,
    pub success: bool,
    pub result_code: String,
}

/// 读取结果：样本 + 逐项结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadItemDto {
    pub point: PointDto,
    pub outcome: OutcomeDto,
}

/// 写入条目。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteItem {
    pub tag: String,
    pub value: serde_json::Value,
}

/// 批量写入请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub values: Vec<WriteItem>,
    /// 是否通过临时订阅组按服务器句柄写入
    #[serde(default, alias = "by_group")]
    pub by_group: bool,
}

/// 历史过滤方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryFilter {
    QualityGood,
    ValueNotNull,
    GoodAndNotNull,
}

fn default_include_bounds() -> bool {
    true
}

/// 原始历史读取请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub tags: Vec<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    /// 0 表示不限制
    #[serde(default)]
    pub max_values: u32,
    #[serde(default = "default_include_bounds")]
    pub include_bounds: bool,
    #[serde(default)]
    pub filter: Option<HistoryFilter>,
}

/// 单个标签的历史序列。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySeriesDto {
    pub tag: String,
    pub success: bool,
    pub result_code: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub points: Vec<PointDto>,
}

/// 指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub reads_issued: u64,
    pub items_read: u64,
    pub read_item_failures: u64,
    pub writes_issued: u64,
    pub items_written: u64,
    pub write_item_failures: u64,
    pub operation_failures: u64,
    pub notifications_dispatched: u64,
    pub notification_items: u64,
    pub history_reads: u64,
    pub history_series: u64,
}
