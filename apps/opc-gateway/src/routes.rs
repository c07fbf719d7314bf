//! 路由定义
//!
//! 集中管理所有路由，将路径映射到对应的 handlers：
//! - 健康检查：/health
//! - 指标快照：/metrics
//! - 连接状态：/api/status
//! - 实时读写：/api/read, /api/write
//! - 历史查询：/api/history

use super::AppState;
use super::handlers::*;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// 创建网关路由（含 request_id/trace_id 注入）
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/api/status", get(get_status))
        .route("/api/read", post(read_values))
        .route("/api/write", post(write_values))
        .route("/api/history", post(read_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(super::request_context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::{Duration, Utc};
    use domain::EndpointAddress;
    use http_body_util::BodyExt;
    use opc_da::DaClient;
    use opc_hda::HdaClient;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(connect: bool) -> AppState {
        let da = DaClient::new(
            EndpointAddress::new("localhost", "Sim.DA.1"),
            Arc::new(simulation::da_server()),
        );
        let hda = HdaClient::new(
            EndpointAddress::new("localhost", "Sim.HDA.1"),
            Arc::new(simulation::hda_server(Utc::now())),
        );
        if connect {
            da.connect().expect("da connect");
            hda.connect().expect("hda connect");
        }
        AppState::new(da, hda)
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value, bool) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let has_request_id = response.headers().contains_key("x-request-id");
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).expect("json");
        (status, body, has_request_id)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_carries_request_ids() {
        let app = create_router(state(false));
        let request = Request::get("/health").body(Body::empty()).expect("request");
        let (status, body, has_request_id) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert!(has_request_id);
    }

    #[tokio::test]
    async fn status_reports_connection_state() {
        let app = create_router(state(true));
        let request = Request::get("/api/status").body(Body::empty()).expect("request");
        let (status, body, _) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["daConnected"], true);
        assert_eq!(body["data"]["daUrl"], "opcda://127.0.0.1/Sim.DA.1");
        assert_eq!(body["data"]["hdaUrl"], "opchda://127.0.0.1/Sim.HDA.1");
    }

    #[tokio::test]
    async fn read_when_disconnected_is_unavailable() {
        let app = create_router(state(false));
        let request = post_json("/api/read", json!({ "tags": ["Plant.Pump.Speed"] }));
        let (status, body, _) = call(app, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "OPC.NOT_CONNECTED");
    }

    #[tokio::test]
    async fn write_then_read_round_trips_through_gateway() {
        let state = state(true);
        let request = post_json(
            "/api/write",
            json!({
                "values": [
                    { "tag": "Plant.Line.Setpoint", "value": 80.5 },
                    { "tag": "Plant.Info.Version", "value": "2.0.0" }
                ],
                "byGroup": true
            }),
        );
        let (status, body, _) = call(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["success"], true);
        assert_eq!(body["data"][1]["success"], false);

        let request = post_json("/api/read", json!({ "tags": ["Plant.Line.Setpoint"] }));
        let (status, body, _) = call(create_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["point"]["value"], 80.5);
        assert_eq!(body["data"][0]["point"]["quality"], 192);
        assert_eq!(body["data"][0]["outcome"]["resultCode"], "S_OK");
    }

    #[tokio::test]
    async fn write_rejects_structured_values() {
        let app = create_router(state(true));
        let request = post_json(
            "/api/write",
            json!({ "values": [{ "tag": "Plant.Line.Setpoint", "value": [1, 2] }] }),
        );
        let (status, body, _) = call(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID.REQUEST");
    }

    #[tokio::test]
    async fn history_applies_quality_filter() {
        let app = create_router(state(true));
        let end = Utc::now();
        let start = end - Duration::hours(2);
        let request = post_json(
            "/api/history",
            json!({
                "tags": ["Plant.Boiler.Temperature"],
                "startMs": start.timestamp_millis(),
                "endMs": end.timestamp_millis(),
                "includeBounds": false,
                "filter": "qualityGood"
            }),
        );
        let (status, body, _) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        let points = body["data"][0]["points"].as_array().expect("points");
        // 60 个样本中有 4 个 Bad 质量点
        assert_eq!(points.len(), 56);
        assert!(points.iter().all(|point| point["good"] == true));
    }

    #[tokio::test]
    async fn history_rejects_inverted_window() {
        let app = create_router(state(true));
        let request = post_json(
            "/api/history",
            json!({ "tags": ["Plant.Boiler.Pressure"], "startMs": 2000, "endMs": 1000 }),
        );
        let (status, _, _) = call(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_snapshot_is_served() {
        let app = create_router(state(false));
        let request = Request::get("/metrics").body(Body::empty()).expect("request");
        let (status, body, _) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["readsIssued"].is_u64());
    }
}
