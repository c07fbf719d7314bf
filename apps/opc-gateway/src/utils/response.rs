//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, client_error, internal_error
//! - DTO 转换：point_to_dto, outcome_to_dto, read_result_to_dto, series_to_dto
//! - 值转换：value_to_json, json_to_value

use api_contract::{ApiResponse, HistorySeriesDto, OutcomeDto, PointDto, ReadItemDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DataPoint, HistorySeries, OperationOutcome, Outcome, ReadResult, Value};
use opc_da::{ClientError, ErrorKind};

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 内部错误响应
pub fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message.into())),
    )
        .into_response()
}

/// 客户端调用级错误响应
pub fn client_error(err: ClientError) -> Response {
    let (status, code) = match (&err, err.kind()) {
        (ClientError::NotConnected, _) => (StatusCode::SERVICE_UNAVAILABLE, "OPC.NOT_CONNECTED"),
        (ClientError::Cancelled, _) => (StatusCode::SERVICE_UNAVAILABLE, "OPC.CANCELLED"),
        (ClientError::InvalidArgument(_), _) => (StatusCode::BAD_REQUEST, "INVALID.REQUEST"),
        (_, ErrorKind::ConnectionFailure) => (StatusCode::BAD_GATEWAY, "OPC.CONNECTION"),
        (_, ErrorKind::OperationFailure) => (StatusCode::BAD_GATEWAY, "OPC.OPERATION"),
        (_, ErrorKind::TransportException) => (StatusCode::BAD_GATEWAY, "OPC.TRANSPORT"),
    };
    (status, Json(ApiResponse::<()>::error(code, err.to_string()))).into_response()
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(flag) => serde_json::Value::Bool(*flag),
        Value::I64(number) => serde_json::Value::from(*number),
        // NaN / 无穷大没有 JSON 表示
        Value::F64(number) => serde_json::Number::from_f64(*number)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(text) => serde_json::Value::String(text.clone()),
    }
}

/// JSON 标量转样本值；null、数组和对象不可写入
pub fn json_to_value(value: serde_json::Value) -> Result<Value, String> {
    match value {
        serde_json::Value::Bool(flag) => Ok(Value::Bool(flag)),
        serde_json::Value::Number(number) => number
            .as_i64()
            .map(Value::I64)
            .or_else(|| number.as_f64().map(Value::F64))
            .ok_or_else(|| format!("unsupported number: {number}")),
        serde_json::Value::String(text) => Ok(Value::String(text)),
        other => Err(format!("unsupported value: {other}")),
    }
}

/// DataPoint 转 PointDto
pub fn point_to_dto(point: &DataPoint) -> PointDto {
    PointDto {
        tag: point.tag.clone(),
        value: point.value.as_ref().map(value_to_json),
        ts_ms: point.timestamp.timestamp_millis(),
        quality: point.quality,
        good: point.is_good(),
    }
}

/// OperationOutcome 转 OutcomeDto
pub fn outcome_to_dto(outcome: OperationOutcome) -> OutcomeDto {
    OutcomeDto {
        item_name: outcome.item_name,
        success: outcome.success,
        result_code: outcome.result_code,
    }
}

/// ReadResult 转 ReadItemDto
pub fn read_result_to_dto(result: ReadResult) -> ReadItemDto {
    ReadItemDto {
        point: point_to_dto(&result.point),
        outcome: outcome_to_dto(result.outcome),
    }
}

/// HistorySeries 转 HistorySeriesDto（`points` 由调用方决定是否先过滤）
pub fn series_to_dto<'a>(
    series: &HistorySeries,
    points: impl IntoIterator<Item = &'a DataPoint>,
) -> HistorySeriesDto {
    HistorySeriesDto {
        tag: series.tag().to_string(),
        success: series.is_success(),
        result_code: series.result_id().to_string(),
        start_ms: series.start_time().timestamp_millis(),
        end_ms: series.end_time().timestamp_millis(),
        points: points.into_iter().map(point_to_dto).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars_convert_to_values() {
        assert_eq!(json_to_value(serde_json::json!(true)), Ok(Value::Bool(true)));
        assert_eq!(json_to_value(serde_json::json!(42)), Ok(Value::I64(42)));
        assert_eq!(json_to_value(serde_json::json!(1.5)), Ok(Value::F64(1.5)));
        assert_eq!(
            json_to_value(serde_json::json!("on")),
            Ok(Value::String("on".to_string()))
        );
        assert!(json_to_value(serde_json::Value::Null).is_err());
        assert!(json_to_value(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn non_finite_float_renders_as_null() {
        assert_eq!(value_to_json(&Value::F64(f64::NAN)), serde_json::Value::Null);
        assert_eq!(value_to_json(&Value::I64(-3)), serde_json::json!(-3));
    }
}
