//! 订阅推送分发
//!
//! 每个原生订阅组一条 `mpsc` 通道和一个命名线程。线程把每次通知转换为
//! 有序的 `Vec<DataPoint>`，在本线程上同步调用该组的回调。
//! 组内顺序与通道顺序一致，不同组之间没有顺序保证。

use domain::DataPoint;
use opc_session::{ClientError, Logger};
use opc_transport::DataChange;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 数据变化回调：只包含本次变化的条目
pub type DataChangeCallback = Arc<dyn Fn(Vec<DataPoint>) + Send + Sync>;

/// 单个订阅组的分发器
pub struct SubscriptionDispatcher {
    group: String,
    callback: Option<DataChangeCallback>,
    logger: Logger,
}

impl SubscriptionDispatcher {
    pub fn new(
        group: impl Into<String>,
        callback: Option<DataChangeCallback>,
        logger: Logger,
    ) -> Self {
        Self {
            group: group.into(),
            callback,
            logger,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// 处理一次通知，返回交给回调的数据点数量。
    ///
    /// 没有回调时通知被丢弃，返回 0。
    pub fn dispatch(&self, change: DataChange) -> usize {
        let Some(callback) = &self.callback else {
            self.logger.scope(|| {
                debug!(
                    target: "opc.da",
                    group = %self.group,
                    items = change.values.len(),
                    "no callback, notification dropped"
                )
            });
            return 0;
        };
        let points: Vec<DataPoint> = change
            .values
            .iter()
            .map(|value| value.to_data_point())
            .collect();
        let count = points.len();
        self.logger.scope(|| {
            debug!(
                target: "opc.da",
                group = %self.group,
                request = ?change.request_handle,
                items = count,
                "data change"
            )
        });
        opc_telemetry::record_notification(count);
        callback(points);
        count
    }

    /// 在独立线程上消费通知，直到发送端被丢弃或句柄被关闭。
    pub fn spawn(
        self,
        receiver: UnboundedReceiver<DataChange>,
    ) -> Result<DispatcherHandle, ClientError> {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let name = format!("opc-da-{}", self.group);
        std::thread::Builder::new()
            .name(name)
            .spawn(move || self.run(receiver, worker_token))
            .map_err(|err| ClientError::Internal(format!("spawn dispatcher failed: {err}")))?;
        Ok(DispatcherHandle { token })
    }

    fn run(self, mut receiver: UnboundedReceiver<DataChange>, token: CancellationToken) {
        while let Some(change) = receiver.blocking_recv() {
            // 关闭之后到达的通知不再回调
            if token.is_cancelled() {
                break;
            }
            self.dispatch(change);
        }
        self.logger.scope(|| {
            if token.is_cancelled() {
                debug!(target: "opc.da", group = %self.group, "dispatcher closed");
            } else {
                warn!(target: "opc.da", group = %self.group, "notification channel closed by server");
            }
        });
    }
}

/// 分发线程的关闭句柄；丢弃即关闭。
#[derive(Debug)]
pub struct DispatcherHandle {
    token: CancellationToken,
}

impl DispatcherHandle {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
