//! 历史查询 handlers
//!
//! - POST /api/history（可选 `filter` 过滤方式）

use crate::AppState;
use crate::utils::response::{bad_request_error, client_error, series_to_dto};
use api_contract::{ApiResponse, HistoryFilter, HistoryRequest, HistorySeriesDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use opc_hda::{FilterMode, SeriesQuery};

fn filter_mode(filter: HistoryFilter) -> FilterMode {
    match filter {
        HistoryFilter::QualityGood => FilterMode::QualityGood,
        HistoryFilter::ValueNotNull => FilterMode::ValueNotNull,
        HistoryFilter::GoodAndNotNull => FilterMode::GoodAndNotNull,
    }
}

fn parse_ms(value: i64, field: &str) -> Result<DateTime<Utc>, Response> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| bad_request_error(format!("{field} out of range")))
}

pub async fn read_history(
    State(state): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> Response {
    if req.tags.is_empty() {
        return bad_request_error("tags must not be empty");
    }
    let start = match parse_ms(req.start_ms, "startMs") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let end = match parse_ms(req.end_ms, "endMs") {
        Ok(value) => value,
        Err(response) => return response,
    };
    if end < start {
        return bad_request_error("endMs must not be earlier than startMs");
    }

    let token = state.shutdown.child_token();
    let series = match state
        .hda
        .read_raw_async(
            req.tags,
            start,
            end,
            req.max_values,
            req.include_bounds,
            &token,
        )
        .await
    {
        Ok(series) => series,
        Err(err) => return client_error(err),
    };

    let data: Vec<HistorySeriesDto> = series
        .iter()
        .map(|item| match req.filter {
            Some(filter) => series_to_dto(item, item.points().filter(filter_mode(filter))),
            None => series_to_dto(item, item.points()),
        })
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}
