//! 健康检查与连接状态
//!
//! - GET /health
//! - GET /api/status

use crate::AppState;
use crate::utils::response::internal_error;
use api_contract::{ApiResponse, StatusDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::UrlScheme;
use tracing::warn;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    // 状态查询会访问服务器，放到阻塞线程池上
    let task = tokio::task::spawn_blocking(move || {
        let da_connected = state.da.is_connected().unwrap_or_else(|err| {
            warn!(target: "opc.gateway", error = %err, "da status unavailable");
            false
        });
        let hda_connected = state.hda.is_connected().unwrap_or_else(|err| {
            warn!(target: "opc.gateway", error = %err, "hda status unavailable");
            false
        });
        StatusDto {
            client_name: state.da.name().to_string(),
            da_url: state.da.endpoint().url(UrlScheme::Da),
            da_connected,
            hda_url: state.hda.endpoint().url(UrlScheme::Hda),
            hda_connected,
            subscriptions: state.da.subscription_count(),
        }
    });
    match task.await {
        Ok(status) => (StatusCode::OK, Json(ApiResponse::success(status))).into_response(),
        Err(err) => internal_error(err.to_string()),
    }
}
