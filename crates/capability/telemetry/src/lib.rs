//! 追踪初始化、可注入 logger 与基础计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
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

/// 基础指标。
pub struct TelemetryMetrics {
    reads_issued: AtomicU64,
    items_read: AtomicU64,
    read_item_failures: AtomicU64,
    writes_issued: AtomicU64,
    items_written: AtomicU64,
    write_item_failures: AtomicU64,
    operation_failures: AtomicU64,
    notifications_dispatched: AtomicU64,
    notification_items: AtomicU64,
    history_reads: AtomicU64,
    history_series: AtomicU64,
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            reads_issued: AtomicU64::new(0),
            items_read: AtomicU64::new(0),
            read_item_failures: AtomicU64::new(0),
            writes_issued: AtomicU64::new(0),
            items_written: AtomicU64::new(0),
            write_item_failures: AtomicU64::new(0),
            operation_failures: AtomicU64::new(0),
            notifications_dispatched: AtomicU64::new(0),
            notification_items: AtomicU64::new(0),
            history_reads: AtomicU64::new(0),
            history_series: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads_issued: self.reads_issued.load(Ordering::Relaxed),
            items_read: self.items_read.load(Ordering::Relaxed),
            read_item_failures: self.read_item_failures.load(Ordering::Relaxed),
            writes_issued: self.writes_issued.load(Ordering::Relaxed),
            items_written: self.items_written.load(Ordering::Relaxed),
            write_item_failures: self.write_item_failures.load(Ordering::Relaxed),
            operation_failures: self.operation_failures.load(Ordering::Relaxed),
            notifications_dispatched: self.notifications_dispatched.load(Ordering::Relaxed),
            notification_items: self.notification_items.load(Ordering::Relaxed),
            history_reads: self.history_reads.load(Ordering::Relaxed),
            history_series: self.history_series.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// 初始化全局 tracing（默认 info）。
pub fn init_tracing() {
    let _ = fmt().with_env_filter(env_filter("info")).try_init();
}

/// 构造可注入客户端的 logger（`RUST_LOG` 优先，否则使用 `default_filter`）。
pub fn logger(default_filter: &str) -> Dispatch {
    let subscriber = fmt().with_env_filter(env_filter(default_filter)).finish();
    Dispatch::new(subscriber)
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录一次批量读取（条目数、逐项失败数）。
pub fn record_read(items: usize, failures: usize) {
    let metrics = metrics();
    metrics.reads_issued.fetch_add(1, Ordering::Relaxed);
    metrics.items_read.fetch_add(items as u64, Ordering::Relaxed);
    metrics
        .read_item_failures
        .fetch_add(failures as u64, Ordering::Relaxed);
}

/// 记录一次批量写入（条目数、逐项失败数）。
pub fn record_write(items: usize, failures: usize) {
    let metrics = metrics();
    metrics.writes_issued.fetch_add(1, Ordering::Relaxed);
    metrics.items_written.fetch_add(items as u64, Ordering::Relaxed);
    metrics
        .write_item_failures
        .fetch_add(failures as u64, Ordering::Relaxed);
}

/// 记录调用级失败次数。
pub fn record_operation_failure() {
    metrics().operation_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次推送分发。
pub fn record_notification(items: usize) {
    let metrics = metrics();
    metrics
        .notifications_dispatched
        .fetch_add(1, Ordering::Relaxed);
    metrics
        .notification_items
        .fetch_add(items as u64, Ordering::Relaxed);
}

/// 记录一次历史读取（返回的序列数）。
pub fn record_history_read(series: usize) {
    let metrics = metrics();
    metrics.history_reads.fetch_add(1, Ordering::Relaxed);
    metrics
        .history_series
        .fetch_add(series as u64, Ordering::Relaxed);
}
