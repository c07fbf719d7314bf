//! 历史数据访问客户端

use chrono::{DateTime, Utc};
use domain::{EndpointAddress, HistorySeries, Outcome, UrlScheme};
use opc_session::{ClientError, ConnectionSession, Logger, run_blocking};
use opc_telemetry::{record_history_read, record_operation_failure};
use opc_transport::{HdaServer, TransportError};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, error, info, warn};

/// OPC HDA 客户端（`Clone` 共享同一会话）。
#[derive(Clone)]
pub struct HdaClient {
    session: Arc<ConnectionSession<dyn HdaServer>>,
    logger: Logger,
}

impl std::fmt::Debug for HdaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdaClient")
            .field("session", &self.session)
            .finish()
    }
}

impl HdaClient {
    pub fn new(endpoint: EndpointAddress, server: Arc<dyn HdaServer>) -> Self {
        Self::with_name("default", endpoint, server)
    }

    pub fn with_name(
        name: impl Into<String>,
        endpoint: EndpointAddress,
        server: Arc<dyn HdaServer>,
    ) -> Self {
        Self {
            session: Arc::new(ConnectionSession::new(name, endpoint, UrlScheme::Hda, server)),
            logger: Logger::default(),
        }
    }

    /// 注入日志实例（默认静默）。
    pub fn with_logger(mut self, dispatch: Dispatch) -> Self {
        self.logger = Logger::new(dispatch);
        self
    }

    pub fn name(&self) -> &str {
        self.session.name()
    }

    pub fn endpoint(&self) -> &EndpointAddress {
        self.session.endpoint()
    }

    pub fn connect(&self) -> Result<(), ClientError> {
        self.logger.scope(|| self.session.connect())
    }

    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.logger.scope(|| self.session.disconnect())
    }

    pub fn is_connected(&self) -> Result<bool, ClientError> {
        self.logger.scope(|| self.session.is_connected())
    }

    /// 原始历史读取：先为全部标签创建条目句柄，再一次性读取。
    ///
    /// `max_values = 0` 表示不限制；`include_bounds` 要求附带窗口外侧的边界样本。
    /// 返回的序列与 `tags` 同序，单个标签的失败体现在序列的结果码上。
    pub fn read_raw<S: AsRef<str>>(
        &self,
        tags: &[S],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_values: u32,
        include_bounds: bool,
    ) -> Result<Vec<HistorySeries>, ClientError> {
        self.logger.scope(|| {
            self.read_raw_inner(tags, start_time, end_time, max_values, include_bounds)
        })
    }

    pub async fn read_raw_async(
        &self,
        tags: Vec<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_values: u32,
        include_bounds: bool,
        token: &CancellationToken,
    ) -> Result<Vec<HistorySeries>, ClientError> {
        let client = self.clone();
        let result = run_blocking(token, move || {
            client.read_raw(&tags, start_time, end_time, max_values, include_bounds)
        })
        .await;
        if matches!(result, Err(ClientError::Cancelled)) {
            self.logger.scope(|| {
                info!(target: "opc.hda", client = %self.name(), "history read cancelled")
            });
        }
        result
    }

    fn read_raw_inner<S: AsRef<str>>(
        &self,
        tags: &[S],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_values: u32,
        include_bounds: bool,
    ) -> Result<Vec<HistorySeries>, ClientError> {
        self.session.ensure_connected().inspect_err(|_| {
            warn!(target: "opc.hda", client = %self.name(), "server not connected");
        })?;
        info!(
            target: "opc.hda",
            client = %self.name(),
            items = tags.len(),
            start = %start_time,
            end = %end_time,
            max_values,
            include_bounds,
            "reading raw history"
        );
        let started = Instant::now();
        let names: Vec<String> = tags.iter().map(|tag| tag.as_ref().to_string()).collect();
        let server = self.session.server();
        let handles = server
            .create_items(&names)
            .map_err(|err| self.native_failure("create_items", err))?;
        let collections = server
            .read_raw(start_time, end_time, max_values, include_bounds, &handles)
            .map_err(|err| self.native_failure("read_raw", err))?;
        if collections.len() != names.len() {
            return Err(self.native_failure(
                "read_raw",
                TransportError::Server(format!(
                    "expected {} series, got {}",
                    names.len(),
                    collections.len()
                )),
            ));
        }

        let errors = collections
            .iter()
            .filter(|collection| !collection.is_success())
            .count();
        let series: Vec<HistorySeries> = collections
            .into_iter()
            .map(|collection| collection.into_series())
            .collect();
        record_history_read(series.len());
        info!(
            target: "opc.hda",
            client = %self.name(),
            items = series.len(),
            errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "history read completed"
        );
        Ok(series)
    }

    fn native_failure(&self, operation: &'static str, err: TransportError) -> ClientError {
        error!(
            target: "opc.hda",
            client = %self.name(),
            operation,
            error = %err,
            "native call failed"
        );
        record_operation_failure();
        match err {
            TransportError::NotConnected => ClientError::NotConnected,
            other => ClientError::Transport(other),
        }
    }
}
