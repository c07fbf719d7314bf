//! 实时读写 handlers
//!
//! - POST /api/read
//! - POST /api/write

use crate::AppState;
use crate::utils::response::{
    bad_request_error, client_error, json_to_value, outcome_to_dto, read_result_to_dto,
};
use api_contract::{ApiResponse, OutcomeDto, ReadItemDto, ReadRequest, WriteRequest};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::TagValue;

pub async fn read_values(State(state): State<AppState>, Json(req): Json<ReadRequest>) -> Response {
    if req.tags.is_empty() {
        return bad_request_error("tags must not be empty");
    }
    let token = state.shutdown.child_token();
    match state.da.read_async(req.tags, &token).await {
        Ok(results) => {
            let data: Vec<ReadItemDto> = results.into_iter().map(read_result_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => client_error(err),
    }
}

pub async fn write_values(State(state): State<AppState>, Json(req): Json<WriteRequest>) -> Response {
    if req.values.is_empty() {
        return bad_request_error("values must not be empty");
    }
    let mut values = Vec::with_capacity(req.values.len());
    for item in req.values {
        match json_to_value(item.value) {
            Ok(value) => values.push(TagValue::new(item.tag, value)),
            Err(message) => return bad_request_error(format!("{}: {}", item.tag, message)),
        }
    }
    let token = state.shutdown.child_token();
    let result = if req.by_group {
        state.da.write_by_group_async(values, &token).await
    } else {
        state.da.write_async(values, &token).await
    };
    match result {
        Ok(outcomes) => {
            let data: Vec<OutcomeDto> = outcomes.into_iter().map(outcome_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => client_error(err),
    }
}
