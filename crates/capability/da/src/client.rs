//! 实时数据访问客户端
//!
//! 批量读写按 `max_operation_items_count` 切分，每批一次原生调用，
//! 结果按输入顺序拼接。订阅组登记表与连接状态共用会话里的同一把锁，
//! 原生读写不在锁内执行。

use crate::batch::chunks;
use crate::dispatcher::{DataChangeCallback, DispatcherHandle, SubscriptionDispatcher};
use chrono::Utc;
use domain::{
    EndpointAddress, OperationOutcome, Outcome, QUALITY_GOOD, ReadResult, ResultId, TagValue,
    UrlScheme, Value,
};
use opc_session::{ClientError, ConnectionSession, Lifecycle, Logger, run_blocking};
use opc_telemetry::{record_operation_failure, record_read, record_write};
use opc_transport::{
    BrowseFilters, BrowseResult, DaServer, IdentifiedResult, ItemIdentifier,
    ItemPropertyCollection, ItemValue, SubscriptionHandle, SubscriptionState, TransportError,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, debug, error, info, warn};

/// 单次原生调用的默认条目上限
pub const DEFAULT_MAX_OPERATION_ITEMS: usize = 5000;

/// 分组写入时使用的临时订阅组参数
const WRITE_GROUP_NAME: &str = "WriteDataGroup (New)";
const WRITE_GROUP_UPDATE_RATE_MS: u32 = 50;
const WRITE_GROUP_DEADBAND: f32 = 10000.0;

/// 客户端配置。
#[derive(Debug, Clone)]
pub struct DaClientConfig {
    /// 日志中使用的显示名
    pub name: String,
    /// 单次原生调用的条目上限（0 按 1 处理）
    pub max_operation_items_count: usize,
}

impl Default for DaClientConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_operation_items_count: DEFAULT_MAX_OPERATION_ITEMS,
        }
    }
}

struct RegisteredGroup {
    name: String,
    handle: SubscriptionHandle,
    dispatcher: DispatcherHandle,
}

/// 已登记的订阅组；断开连接后整体清空。
#[derive(Default)]
struct SubscriptionRegistry {
    groups: Vec<RegisteredGroup>,
}

struct DaClientInner {
    session: ConnectionSession<dyn DaServer, SubscriptionRegistry>,
    max_operation_items_count: usize,
}

/// OPC DA 客户端（`Clone` 共享同一会话）。
#[derive(Clone)]
pub struct DaClient {
    inner: Arc<DaClientInner>,
    logger: Logger,
}

impl std::fmt::Debug for DaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaClient")
            .field("session", &self.inner.session)
            .field("max_operation_items_count", &self.inner.max_operation_items_count)
            .finish()
    }
}

impl DaClient {
    pub fn new(endpoint: EndpointAddress, server: Arc<dyn DaServer>) -> Self {
        Self::with_config(endpoint, server, DaClientConfig::default())
    }

    pub fn with_config(
        endpoint: EndpointAddress,
        server: Arc<dyn DaServer>,
        config: DaClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DaClientInner {
                session: ConnectionSession::new(config.name, endpoint, UrlScheme::Da, server),
                max_operation_items_count: config.max_operation_items_count.max(1),
            }),
            logger: Logger::default(),
        }
    }

    /// 注入日志实例（默认静默）。
    pub fn with_logger(mut self, dispatch: Dispatch) -> Self {
        self.logger = Logger::new(dispatch);
        self
    }

    pub fn name(&self) -> &str {
        self.inner.session.name()
    }

    pub fn endpoint(&self) -> &EndpointAddress {
        self.inner.session.endpoint()
    }

    pub fn max_operation_items_count(&self) -> usize {
        self.inner.max_operation_items_count
    }

    pub fn connect(&self) -> Result<(), ClientError> {
        self.logger.scope(|| self.inner.session.connect())
    }

    /// 断开连接；成功后本地订阅组登记表清空，分发线程随之关闭。
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.logger.scope(|| self.inner.session.disconnect())
    }

    pub fn is_connected(&self) -> Result<bool, ClientError> {
        self.logger.scope(|| self.inner.session.is_connected())
    }

    /// 批量读取，结果与输入同序。
    pub fn read<S: AsRef<str>>(&self, tags: &[S]) -> Result<Vec<ReadResult>, ClientError> {
        self.logger.scope(|| self.inner.read(tags))
    }

    pub fn read_one(&self, tag: &str) -> Result<Option<ReadResult>, ClientError> {
        Ok(self.read(&[tag])?.into_iter().next())
    }

    /// 批量写入；每个条目带当前 UTC 时间戳与 Good 质量。
    pub fn write(&self, values: &[TagValue]) -> Result<Vec<OperationOutcome>, ClientError> {
        self.logger.scope(|| self.inner.write(values))
    }

    pub fn write_one(
        &self,
        tag: &str,
        value: impl Into<Value>,
    ) -> Result<Option<OperationOutcome>, ClientError> {
        Ok(self
            .write(&[TagValue::new(tag, value)])?
            .into_iter()
            .next())
    }

    /// 通过临时订阅组按服务器句柄写入，结果语义与 [`DaClient::write`] 相同。
    pub fn write_by_group(&self, values: &[TagValue]) -> Result<Vec<OperationOutcome>, ClientError> {
        self.logger.scope(|| self.inner.write_by_group(values))
    }

    /// 创建订阅组；同名订阅会再创建一个原生组，不会替换已有的组。
    pub fn subscribe<S: AsRef<str>>(
        &self,
        tags: &[S],
        group_name: &str,
        update_rate_ms: u32,
        callback: Option<DataChangeCallback>,
    ) -> Result<SubscriptionHandle, ClientError> {
        self.logger.scope(|| {
            self.inner
                .subscribe(tags, group_name, update_rate_ms, callback, &self.logger)
        })
    }

    /// 取消该名称下的全部订阅组。没有匹配的组时直接返回。
    pub fn unsubscribe(&self, group_name: &str) -> Result<(), ClientError> {
        self.logger
            .scope(|| self.inner.unsubscribe(|group| group.name == group_name))
    }

    pub fn unsubscribe_all(&self) -> Result<(), ClientError> {
        self.logger.scope(|| self.inner.unsubscribe(|_| true))
    }

    /// 服务器上的订阅组数量；服务器不可达时为 0。
    pub fn subscription_count(&self) -> usize {
        self.logger.scope(|| self.inner.subscription_count())
    }

    /// 本客户端登记的订阅组名称（按创建顺序，同名重复出现）。
    pub fn subscription_names(&self) -> Result<Vec<String>, ClientError> {
        self.inner.session.with_state(|_, registry| {
            registry
                .groups
                .iter()
                .map(|group| group.name.clone())
                .collect()
        })
    }

    pub fn browse(
        &self,
        item: Option<&str>,
        filters: &BrowseFilters,
        continuation: Option<&str>,
    ) -> Result<BrowseResult, ClientError> {
        self.logger.scope(|| {
            self.inner.session.ensure_connected()?;
            let item = item.map(ItemIdentifier::new);
            self.inner
                .session
                .server()
                .browse(item.as_ref(), filters, continuation)
                .map_err(|err| self.inner.native_failure("browse", None, err))
        })
    }

    pub fn get_properties<S: AsRef<str>>(
        &self,
        items: &[S],
        property_ids: &[u32],
        return_values: bool,
    ) -> Result<Vec<ItemPropertyCollection>, ClientError> {
        self.logger.scope(|| {
            self.inner.session.ensure_connected()?;
            let items: Vec<ItemIdentifier> = items
                .iter()
                .map(|item| ItemIdentifier::new(item.as_ref()))
                .collect();
            self.inner
                .session
                .server()
                .get_properties(&items, property_ids, return_values)
                .map_err(|err| self.inner.native_failure("get_properties", None, err))
        })
    }

    pub async fn read_async(
        &self,
        tags: Vec<String>,
        token: &CancellationToken,
    ) -> Result<Vec<ReadResult>, ClientError> {
        let client = self.clone();
        let result = run_blocking(token, move || client.read(&tags)).await;
        self.log_cancelled("read", &result);
        result
    }

    pub async fn read_one_async(
        &self,
        tag: String,
        token: &CancellationToken,
    ) -> Result<Option<ReadResult>, ClientError> {
        let client = self.clone();
        let result = run_blocking(token, move || client.read_one(&tag)).await;
        self.log_cancelled("read_one", &result);
        result
    }

    pub async fn write_async(
        &self,
        values: Vec<TagValue>,
        token: &CancellationToken,
    ) -> Result<Vec<OperationOutcome>, ClientError> {
        let client = self.clone();
        let result = run_blocking(token, move || client.write(&values)).await;
        self.log_cancelled("write", &result);
        result
    }

    pub async fn write_one_async(
        &self,
        tag: String,
        value: Value,
        token: &CancellationToken,
    ) -> Result<Option<OperationOutcome>, ClientError> {
        let client = self.clone();
        let result = run_blocking(token, move || client.write_one(&tag, value)).await;
        self.log_cancelled("write_one", &result);
        result
    }

    pub async fn write_by_group_async(
        &self,
        values: Vec<TagValue>,
        token: &CancellationToken,
    ) -> Result<Vec<OperationOutcome>, ClientError> {
        let client = self.clone();
        let result = run_blocking(token, move || client.write_by_group(&values)).await;
        self.log_cancelled("write_by_group", &result);
        result
    }

    fn log_cancelled<T>(&self, operation: &'static str, result: &Result<T, ClientError>) {
        if matches!(result, Err(ClientError::Cancelled)) {
            self.logger.scope(|| {
                info!(target: "opc.da", client = %self.name(), operation, "operation cancelled")
            });
        }
    }
}

impl DaClientInner {
    fn name(&self) -> &str {
        self.session.name()
    }

    fn require_connected(&self, operation: &'static str) -> Result<(), ClientError> {
        self.session.ensure_connected().inspect_err(|_| {
            warn!(target: "opc.da", client = %self.name(), operation, "server not connected");
        })
    }

    /// 原生调用失败：记录日志并转换为调用级错误
    fn native_failure(
        &self,
        operation: &'static str,
        batch: Option<usize>,
        err: TransportError,
    ) -> ClientError {
        error!(
            target: "opc.da",
            client = %self.name(),
            operation,
            batch = ?batch,
            error = %err,
            "native call failed"
        );
        record_operation_failure();
        match err {
            TransportError::NotConnected => ClientError::NotConnected,
            other => ClientError::Transport(other),
        }
    }

    fn check_count(
        &self,
        operation: &'static str,
        batch: usize,
        expected: usize,
        actual: usize,
    ) -> Result<(), ClientError> {
        if expected == actual {
            return Ok(());
        }
        Err(self.native_failure(
            operation,
            Some(batch),
            TransportError::Server(format!("expected {expected} results, got {actual}")),
        ))
    }

    fn read<S: AsRef<str>>(&self, tags: &[S]) -> Result<Vec<ReadResult>, ClientError> {
        self.require_connected("read")?;
        let started = Instant::now();
        let mut results = Vec::with_capacity(tags.len());
        let mut errors = 0usize;
        for (index, batch) in chunks(tags, self.max_operation_items_count)
            .into_iter()
            .enumerate()
        {
            let items: Vec<ItemIdentifier> = batch
                .iter()
                .map(|tag| ItemIdentifier::new(tag.as_ref()))
                .collect();
            let values = self
                .session
                .server()
                .read(&items)
                .map_err(|err| self.native_failure("read", Some(index), err))?;
            self.check_count("read", index, items.len(), values.len())?;
            for value in values {
                let outcome = value.outcome();
                if !outcome.success {
                    errors += 1;
                }
                results.push(ReadResult {
                    point: value.to_data_point(),
                    outcome,
                });
            }
        }
        record_read(results.len(), errors);
        info!(
            target: "opc.da",
            client = %self.name(),
            items = results.len(),
            errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "read completed"
        );
        Ok(results)
    }

    fn write(&self, values: &[TagValue]) -> Result<Vec<OperationOutcome>, ClientError> {
        self.require_connected("write")?;
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(values.len());
        for (index, batch) in chunks(values, self.max_operation_items_count)
            .into_iter()
            .enumerate()
        {
            let items: Vec<ItemValue> = batch
                .iter()
                .map(|value| stamped(ItemIdentifier::new(value.tag.as_str()), &value.value))
                .collect();
            let results = self
                .session
                .server()
                .write(&items)
                .map_err(|err| self.native_failure("write", Some(index), err))?;
            self.check_count("write", index, items.len(), results.len())?;
            outcomes.extend(results.iter().map(Outcome::outcome));
        }
        self.finish_write("write", &outcomes, started);
        Ok(outcomes)
    }

    fn write_by_group(&self, values: &[TagValue]) -> Result<Vec<OperationOutcome>, ClientError> {
        self.require_connected("write_by_group")?;
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(values.len());
        for (index, batch) in chunks(values, self.max_operation_items_count)
            .into_iter()
            .enumerate()
        {
            outcomes.extend(self.write_batch_by_group(index, batch)?);
        }
        self.finish_write("write_by_group", &outcomes, started);
        Ok(outcomes)
    }

    fn write_batch_by_group(
        &self,
        index: usize,
        batch: &[TagValue],
    ) -> Result<Vec<OperationOutcome>, ClientError> {
        let server = self.session.server();
        let state = SubscriptionState {
            name: WRITE_GROUP_NAME.to_string(),
            update_rate_ms: WRITE_GROUP_UPDATE_RATE_MS,
            active: true,
            deadband: WRITE_GROUP_DEADBAND,
        };
        // 临时组的推送不需要消费
        let (sink, _) = mpsc::unbounded_channel();
        let group = server
            .create_subscription(&state, sink)
            .map_err(|err| self.native_failure("write_by_group", Some(index), err))?;

        let result = self.write_through_group(index, group, batch);

        if let Err(err) = server.cancel_subscription(group) {
            warn!(
                target: "opc.da",
                client = %self.name(),
                batch = index,
                error = %err,
                "cancel temporary write group failed"
            );
        }
        result
    }

    fn write_through_group(
        &self,
        index: usize,
        group: SubscriptionHandle,
        batch: &[TagValue],
    ) -> Result<Vec<OperationOutcome>, ClientError> {
        let server = self.session.server();
        let items: Vec<ItemIdentifier> = batch
            .iter()
            .map(|value| ItemIdentifier::new(value.tag.as_str()))
            .collect();
        let added = server
            .add_items(group, &items)
            .map_err(|err| self.native_failure("write_by_group", Some(index), err))?;
        self.check_count("write_by_group", index, items.len(), added.len())?;

        // 添加失败的条目直接以添加结果作为写入结果
        let mut slots: Vec<Option<OperationOutcome>> = Vec::with_capacity(batch.len());
        let mut pending = Vec::new();
        for (value, added) in batch.iter().zip(added) {
            match added_handle(added) {
                Ok(handle) => {
                    let item = ItemIdentifier {
                        item_name: value.tag.clone(),
                        server_handle: Some(handle),
                    };
                    pending.push(stamped(item, &value.value));
                    slots.push(None);
                }
                Err(failed) => slots.push(Some(failed.outcome())),
            }
        }

        let written = if pending.is_empty() {
            Vec::new()
        } else {
            server
                .write_group(group, &pending)
                .map_err(|err| self.native_failure("write_by_group", Some(index), err))?
        };
        self.check_count("write_by_group", index, pending.len(), written.len())?;

        let mut written = written.iter();
        let mut outcomes = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Some(outcome) => outcomes.push(outcome),
                None => outcomes.extend(written.next().map(Outcome::outcome)),
            }
        }
        Ok(outcomes)
    }

    fn finish_write(&self, operation: &'static str, outcomes: &[OperationOutcome], started: Instant) {
        let errors = outcomes.iter().filter(|outcome| !outcome.success).count();
        record_write(outcomes.len(), errors);
        info!(
            target: "opc.da",
            client = %self.name(),
            operation,
            items = outcomes.len(),
            errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "write completed"
        );
    }

    fn subscribe<S: AsRef<str>>(
        &self,
        tags: &[S],
        group_name: &str,
        update_rate_ms: u32,
        callback: Option<DataChangeCallback>,
        logger: &Logger,
    ) -> Result<SubscriptionHandle, ClientError> {
        if !self.session.is_connected()? {
            info!(
                target: "opc.da",
                client = %self.name(),
                group = %group_name,
                "server not connected, subscription skipped"
            );
            return Err(ClientError::NotConnected);
        }
        let server = self.session.server();
        let (sink, receiver) = mpsc::unbounded_channel();
        let state = SubscriptionState::new(group_name, update_rate_ms);
        let handle = server
            .create_subscription(&state, sink)
            .map_err(|err| self.native_failure("subscribe", None, err))?;

        let items: Vec<ItemIdentifier> = tags
            .iter()
            .map(|tag| ItemIdentifier::new(tag.as_ref()))
            .collect();
        let added = match server.add_items(handle, &items) {
            Ok(added) => added,
            Err(err) => {
                self.cancel_quietly(handle, group_name);
                return Err(self.native_failure("subscribe", None, err));
            }
        };
        let errors = added.iter().filter(|result| !result.is_success()).count();
        if errors > 0 {
            warn!(
                target: "opc.da",
                client = %self.name(),
                group = %group_name,
                errors,
                "some items could not be added to subscription"
            );
        }

        let dispatcher = SubscriptionDispatcher::new(group_name, callback, logger.clone())
            .spawn(receiver)
            .inspect_err(|_| self.cancel_quietly(handle, group_name))?;
        self.session.with_state(|_, registry| {
            registry.groups.push(RegisteredGroup {
                name: group_name.to_string(),
                handle,
                dispatcher,
            })
        })?;
        info!(
            target: "opc.da",
            client = %self.name(),
            group = %group_name,
            items = items.len(),
            update_rate_ms,
            "subscribed"
        );
        Ok(handle)
    }

    fn unsubscribe(&self, matches: impl Fn(&RegisteredGroup) -> bool) -> Result<(), ClientError> {
        let removed = self.session.with_state(|_, registry| {
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut registry.groups)
                .into_iter()
                .partition(|group| matches(group));
            registry.groups = kept;
            removed
        })?;
        if removed.is_empty() {
            debug!(target: "opc.da", client = %self.name(), "no matching subscription");
            return Ok(());
        }

        let mut first_error = None;
        let mut failed = Vec::new();
        for group in removed {
            match self.session.server().cancel_subscription(group.handle) {
                Ok(()) => {
                    group.dispatcher.close();
                    info!(target: "opc.da", client = %self.name(), group = %group.name, "unsubscribed")
                }
                Err(err) => {
                    let err = self.native_failure("unsubscribe", None, err);
                    first_error.get_or_insert(err);
                    failed.push(group);
                }
            }
        }
        if !failed.is_empty() {
            // 取消失败的组仍在服务器上，放回登记表以便重试
            self.session.with_state(|lifecycle, registry| {
                if lifecycle == Lifecycle::Connected {
                    registry.groups.extend(failed);
                }
            })?;
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// 清理未登记的订阅组，失败只记录日志
    fn cancel_quietly(&self, handle: SubscriptionHandle, group_name: &str) {
        if let Err(err) = self.session.server().cancel_subscription(handle) {
            warn!(
                target: "opc.da",
                client = %self.name(),
                group = %group_name,
                error = %err,
                "cancel subscription after failed subscribe failed"
            );
        }
    }

    fn subscription_count(&self) -> usize {
        match self.session.lifecycle() {
            Ok(Lifecycle::Connected) => {}
            _ => return 0,
        }
        match self.session.server().subscriptions() {
            Ok(groups) => groups.len(),
            Err(err) => {
                warn!(
                    target: "opc.da",
                    client = %self.name(),
                    error = %err,
                    "subscription count unavailable"
                );
                0
            }
        }
    }
}

/// 添加成功的条目返回服务器句柄，否则返回作为写入结果的添加结果
fn added_handle(result: IdentifiedResult) -> Result<u64, IdentifiedResult> {
    match (result.is_success(), result.server_handle) {
        (true, Some(handle)) => Ok(handle),
        (true, None) => Err(IdentifiedResult {
            result_id: ResultId::InvalidHandle,
            ..result
        }),
        (false, _) => Err(result),
    }
}

fn stamped(item: ItemIdentifier, value: &Value) -> ItemValue {
    ItemValue {
        item,
        value: Some(value.clone()),
        timestamp: Some(Utc::now()),
        quality: QUALITY_GOOD,
    }
}
