//! 指标快照
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opc_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            reads_issued: snapshot.reads_issued,
            items_read: snapshot.items_read,
            read_item_failures: snapshot.read_item_failures,
            writes_issued: snapshot.writes_issued,
            items_written: snapshot.items_written,
            write_item_failures: snapshot.write_item_failures,
            operation_failures: snapshot.operation_failures,
            notifications_dispatched: snapshot.notifications_dispatched,
            notification_items: snapshot.notification_items,
            history_reads: snapshot.history_reads,
            history_series: snapshot.history_series,
        })),
    )
        .into_response()
}
