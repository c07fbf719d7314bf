//! OPC 网关：通过 HTTP 暴露实时读写、历史查询与连接状态，并注入请求追踪 ID。

mod handlers;
mod routes;
mod simulation;
mod utils;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use domain::{DataPoint, EndpointAddress};
use opc_config::AppConfig;
use opc_da::{DaClient, DaClientConfig, DataChangeCallback};
use opc_hda::HdaClient;
use opc_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub da: DaClient,
    pub hda: HdaClient,
    /// 进程退出时取消，尚未交给阻塞线程池的请求随之取消
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(da: DaClient, hda: HdaClient) -> Self {
        Self {
            da,
            hda,
            shutdown: CancellationToken::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 客户端使用独立的 logger，级别由 OPC_LOG 控制
    let logger = opc_telemetry::logger(&config.log_filter);
    let da = DaClient::with_config(
        EndpointAddress::new(config.da_host.clone(), config.da_server.clone()),
        Arc::new(simulation::da_server()),
        DaClientConfig {
            name: config.client_name.clone(),
            max_operation_items_count: config.max_operation_items,
        },
    )
    .with_logger(logger.clone());
    let hda = HdaClient::with_name(
        config.client_name.clone(),
        EndpointAddress::new(config.hda_host.clone(), config.hda_server.clone()),
        Arc::new(simulation::hda_server(Utc::now())),
    )
    .with_logger(logger);
    let state = AppState::new(da, hda);

    if config.connect_on_start {
        connect_clients(&state).await;
    }

    let app = routes::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "opc.gateway", addr = %config.http_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await?;

    disconnect_clients(&state).await;
    Ok(())
}

/// 连接两个客户端并订阅演示标签；失败只记录日志，状态可通过 /api/status 查看
async fn connect_clients(state: &AppState) {
    let da = state.da.clone();
    let hda = state.hda.clone();
    let task = tokio::task::spawn_blocking(move || {
        if let Err(err) = da.connect() {
            warn!(target: "opc.gateway", error = %err, "da connect failed");
            return;
        }
        let callback: DataChangeCallback = Arc::new(|points: Vec<DataPoint>| {
            for point in points {
                debug!(
                    target: "opc.gateway",
                    tag = %point.tag,
                    value = ?point.value,
                    quality = point.quality,
                    "data change"
                );
            }
        });
        if let Err(err) = da.subscribe(
            &simulation::MONITORED_TAGS,
            "gateway-monitor",
            1000,
            Some(callback),
        ) {
            warn!(target: "opc.gateway", error = %err, "subscribe failed");
        }
        if let Err(err) = hda.connect() {
            warn!(target: "opc.gateway", error = %err, "hda connect failed");
        }
    });
    if let Err(err) = task.await {
        warn!(target: "opc.gateway", error = %err, "connect task failed");
    }
}

async fn disconnect_clients(state: &AppState) {
    let da = state.da.clone();
    let hda = state.hda.clone();
    let task = tokio::task::spawn_blocking(move || {
        if let Err(err) = da.unsubscribe_all() {
            warn!(target: "opc.gateway", error = %err, "unsubscribe failed");
        }
        if let Err(err) = da.disconnect() {
            warn!(target: "opc.gateway", error = %err, "da disconnect failed");
        }
        if let Err(err) = hda.disconnect() {
            warn!(target: "opc.gateway", error = %err, "hda disconnect failed");
        }
    });
    if let Err(err) = task.await {
        warn!(target: "opc.gateway", error = %err, "disconnect task failed");
    }
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "opc.gateway", error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    info!(target: "opc.gateway", "shutting down");
    token.cancel();
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
