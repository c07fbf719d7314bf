//! 实时数据访问的内存模拟服务器

use super::{Fault, Faults, lock_failed};
use crate::error::TransportError;
use crate::server::{DaServer, ServerConnection};
use crate::types::{
    BrowseElement, BrowseFilter, BrowseFilters, BrowseResult, DataChange, IdentifiedResult,
    ItemIdentifier, ItemProperty, ItemPropertyCollection, ItemValue, ItemValueResult,
    NotificationSink, ServerHandle, SubscriptionHandle, SubscriptionInfo, SubscriptionState,
};
use chrono::{DateTime, Utc};
use domain::{QUALITY_GOOD, ResultId, TagValue, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// 属性 ID：规范数据类型
pub const PROPERTY_DATA_TYPE: u32 = 1;
/// 属性 ID：当前值
pub const PROPERTY_VALUE: u32 = 2;
/// 属性 ID：质量码
pub const PROPERTY_QUALITY: u32 = 3;
/// 属性 ID：时间戳
pub const PROPERTY_TIMESTAMP: u32 = 4;
/// 属性 ID：访问权限
pub const PROPERTY_ACCESS_RIGHTS: u32 = 5;

#[derive(Debug, Clone)]
struct SimTag {
    value: Option<Value>,
    quality: u16,
    timestamp: DateTime<Utc>,
    writable: bool,
}

struct SimGroup {
    handle: SubscriptionHandle,
    state: SubscriptionState,
    items: Vec<(String, ServerHandle)>,
    sink: NotificationSink,
}

#[derive(Default)]
struct DaState {
    connected: bool,
    url: Option<String>,
    faults: Faults,
    tags: BTreeMap<String, SimTag>,
    groups: Vec<SimGroup>,
    next_handle: u64,
    read_batches: Vec<usize>,
    write_batches: Vec<usize>,
    request_counter: u64,
}

impl DaState {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn read_item(&self, name: &str) -> ItemValueResult {
        match self.tags.get(name) {
            Some(tag) => ItemValueResult {
                item_name: name.to_string(),
                value: tag.value.clone(),
                timestamp: tag.timestamp,
                quality: tag.quality,
                result_id: ResultId::Ok,
            },
            None => ItemValueResult {
                item_name: name.to_string(),
                value: None,
                timestamp: Utc::now(),
                quality: 0,
                result_id: ResultId::UnknownItemName,
            },
        }
    }

    fn write_item(&mut self, name: &str, value: &ItemValue) -> ResultId {
        let Some(tag) = self.tags.get_mut(name) else {
            return ResultId::UnknownItemName;
        };
        if !tag.writable {
            return ResultId::ReadOnly;
        }
        tag.value = value.value.clone();
        tag.quality = value.quality;
        tag.timestamp = value.timestamp.unwrap_or_else(Utc::now);
        ResultId::Ok
    }

    /// 向包含变化条目的订阅组推送，每组一次通知。
    fn notify(&mut self, changed: &[String]) {
        let mut pending = Vec::new();
        for group in &self.groups {
            if !group.state.active {
                continue;
            }
            let values: Vec<ItemValueResult> = changed
                .iter()
                .filter(|name| group.items.iter().any(|(item, _)| item == *name))
                .map(|name| self.read_item(name))
                .collect();
            if !values.is_empty() {
                pending.push((group.handle, group.sink.clone(), values));
            }
        }
        for (handle, sink, values) in pending {
            self.request_counter += 1;
            let change = DataChange {
                subscription: handle,
                request_handle: Some(self.request_counter),
                values,
            };
            // 接收端已关闭时丢弃
            let _ = sink.send(change);
        }
    }
}

/// 实时数据访问内存服务器
pub struct InMemoryDaServer {
    state: Mutex<DaState>,
}

impl Default for InMemoryDaServer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDaServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DaState::default()),
        }
    }

    /// 添加可读写标签（好质量）
    pub fn with_tag(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_tag(name.into(), Some(value.into()), true);
        self
    }

    /// 添加只读标签（好质量）
    pub fn with_read_only_tag(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_tag(name.into(), Some(value.into()), false);
        self
    }

    fn insert_tag(&self, name: String, value: Option<Value>, writable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.tags.insert(
                name,
                SimTag {
                    value,
                    quality: QUALITY_GOOD,
                    timestamp: Utc::now(),
                    writable,
                },
            );
        }
    }

    /// 注入或清除某个操作的故障
    pub fn set_fault(&self, fault: Fault, message: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.set(fault, message.map(str::to_string));
        }
    }

    /// 服务器侧更新标签值，并向订阅组推送
    pub fn set_value(&self, name: &str, value: impl Into<Value>, quality: u16) {
        self.update_values(vec![TagValue::new(name, value)], quality);
    }

    /// 批量更新标签值：每个订阅组只收到一次包含其变化条目的通知
    pub fn update_values(&self, changes: Vec<TagValue>, quality: u16) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let now = Utc::now();
        let mut changed = Vec::with_capacity(changes.len());
        for change in changes {
            let entry = state.tags.entry(change.tag.clone()).or_insert(SimTag {
                value: None,
                quality,
                timestamp: now,
                writable: true,
            });
            entry.value = Some(change.value);
            entry.quality = quality;
            entry.timestamp = now;
            changed.push(change.tag);
        }
        state.notify(&changed);
    }

    /// 当前标签值
    pub fn value(&self, name: &str) -> Option<Value> {
        let state = self.state.lock().ok()?;
        state.tags.get(name).and_then(|tag| tag.value.clone())
    }

    /// 最近一次连接使用的 URL
    pub fn connected_url(&self) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.url.clone())
    }

    /// 每次原生读取调用的条目数（用于测试）
    pub fn read_batches(&self) -> Vec<usize> {
        self.state
            .lock()
            .map(|state| state.read_batches.clone())
            .unwrap_or_default()
    }

    /// 每次原生写入调用的条目数（用于测试）
    pub fn write_batches(&self) -> Vec<usize> {
        self.state
            .lock()
            .map(|state| state.write_batches.clone())
            .unwrap_or_default()
    }
}

impl ServerConnection for InMemoryDaServer {
    fn connect(&self, url: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.faults.check(Fault::Connect)?;
        state.connected = true;
        state.url = Some(url.to_string());
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.faults.check(Fault::Disconnect)?;
        state.connected = false;
        // 断开连接时服务器释放全部订阅组
        state.groups.clear();
        Ok(())
    }

    fn is_connected(&self) -> Result<bool, TransportError> {
        let state = self.state.lock().map_err(|_| lock_failed())?;
        state.faults.check(Fault::Status)?;
        Ok(state.connected)
    }
}

impl DaServer for InMemoryDaServer {
    fn read(&self, items: &[ItemIdentifier]) -> Result<Vec<ItemValueResult>, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        state.faults.check(Fault::Read)?;
        state.read_batches.push(items.len());
        Ok(items
            .iter()
            .map(|item| state.read_item(&item.item_name))
            .collect())
    }

    fn write(&self, values: &[ItemValue]) -> Result<Vec<IdentifiedResult>, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        state.faults.check(Fault::Write)?;
        state.write_batches.push(values.len());
        let mut results = Vec::with_capacity(values.len());
        let mut changed = Vec::new();
        for value in values {
            let name = value.item.item_name.clone();
            let result_id = state.write_item(&name, value);
            if result_id.is_ok() {
                changed.push(name.clone());
            }
            results.push(IdentifiedResult {
                item_name: name,
                server_handle: value.item.server_handle,
                result_id,
            });
        }
        state.notify(&changed);
        Ok(results)
    }

    fn create_subscription(
        &self,
        subscription: &SubscriptionState,
        sink: NotificationSink,
    ) -> Result<SubscriptionHandle, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        state.faults.check(Fault::Subscribe)?;
        let handle = SubscriptionHandle(state.next_handle());
        state.groups.push(SimGroup {
            handle,
            state: subscription.clone(),
            items: Vec::new(),
            sink,
        });
        Ok(handle)
    }

    fn add_items(
        &self,
        group: SubscriptionHandle,
        items: &[ItemIdentifier],
    ) -> Result<Vec<IdentifiedResult>, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        let mut results = Vec::with_capacity(items.len());
        let mut added = Vec::new();
        for item in items {
            if state.tags.contains_key(&item.item_name) {
                let server_handle = state.next_handle();
                added.push((item.item_name.clone(), server_handle));
                results.push(IdentifiedResult {
                    item_name: item.item_name.clone(),
                    server_handle: Some(server_handle),
                    result_id: ResultId::Ok,
                });
            } else {
                results.push(IdentifiedResult {
                    item_name: item.item_name.clone(),
                    server_handle: None,
                    result_id: ResultId::UnknownItemName,
                });
            }
        }
        let target = state
            .groups
            .iter_mut()
            .find(|candidate| candidate.handle == group)
            .ok_or(TransportError::InvalidHandle(group.0))?;
        target.items.extend(added);
        Ok(results)
    }

    fn write_group(
        &self,
        group: SubscriptionHandle,
        values: &[ItemValue],
    ) -> Result<Vec<IdentifiedResult>, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        state.faults.check(Fault::Write)?;
        let items = state
            .groups
            .iter()
            .find(|candidate| candidate.handle == group)
            .map(|candidate| candidate.items.clone())
            .ok_or(TransportError::InvalidHandle(group.0))?;
        state.write_batches.push(values.len());
        let mut results = Vec::with_capacity(values.len());
        let mut changed = Vec::new();
        for value in values {
            let resolved = value.item.server_handle.and_then(|handle| {
                items
                    .iter()
                    .find(|(_, server_handle)| *server_handle == handle)
                    .map(|(name, _)| name.clone())
            });
            let result_id = match resolved {
                Some(name) => {
                    let result_id = state.write_item(&name, value);
                    if result_id.is_ok() {
                        changed.push(name);
                    }
                    result_id
                }
                None => ResultId::InvalidHandle,
            };
            results.push(IdentifiedResult {
                item_name: value.item.item_name.clone(),
                server_handle: value.item.server_handle,
                result_id,
            });
        }
        state.notify(&changed);
        Ok(results)
    }

    fn cancel_subscription(&self, group: SubscriptionHandle) -> Result<(), TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        let before = state.groups.len();
        state.groups.retain(|candidate| candidate.handle != group);
        if state.groups.len() == before {
            return Err(TransportError::InvalidHandle(group.0));
        }
        Ok(())
    }

    fn subscriptions(&self) -> Result<Vec<SubscriptionInfo>, TransportError> {
        let state = self.state.lock().map_err(|_| lock_failed())?;
        Ok(state
            .groups
            .iter()
            .map(|group| SubscriptionInfo {
                handle: group.handle,
                name: group.state.name.clone(),
            })
            .collect())
    }

    fn browse(
        &self,
        item: Option<&ItemIdentifier>,
        filters: &BrowseFilters,
        continuation: Option<&str>,
    ) -> Result<BrowseResult, TransportError> {
        let state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        let prefix = match item {
            Some(item) if !item.item_name.is_empty() => format!("{}.", item.item_name),
            _ => String::new(),
        };
        let children: BTreeSet<&str> = state
            .tags
            .keys()
            .filter_map(|name| name.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('.').next())
            .collect();

        let mut elements = Vec::new();
        for child in children {
            let item_name = format!("{}{}", prefix, child);
            let is_item = state.tags.contains_key(&item_name);
            let branch_prefix = format!("{}.", item_name);
            let has_children = state
                .tags
                .keys()
                .any(|name| name.starts_with(&branch_prefix));
            let keep = match filters.element_filter {
                BrowseFilter::All => true,
                BrowseFilter::Branch => has_children,
                BrowseFilter::Item => is_item,
            };
            let name_match = filters
                .name_filter
                .as_deref()
                .map(|pattern| child.contains(pattern))
                .unwrap_or(true);
            if keep && name_match {
                elements.push(BrowseElement {
                    name: child.to_string(),
                    item_name,
                    is_item,
                    has_children,
                });
            }
        }

        let offset = continuation
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        let mut elements: Vec<BrowseElement> = elements.into_iter().skip(offset).collect();
        let mut next = None;
        if filters.max_elements > 0 && elements.len() > filters.max_elements as usize {
            elements.truncate(filters.max_elements as usize);
            next = Some((offset + elements.len()).to_string());
        }
        Ok(BrowseResult {
            elements,
            continuation: next,
        })
    }

    fn get_properties(
        &self,
        items: &[ItemIdentifier],
        property_ids: &[u32],
        return_values: bool,
    ) -> Result<Vec<ItemPropertyCollection>, TransportError> {
        let state = self.state.lock().map_err(|_| lock_failed())?;
        state.ensure_connected()?;
        Ok(items
            .iter()
            .map(|item| match state.tags.get(&item.item_name) {
                Some(tag) => ItemPropertyCollection {
                    item_name: item.item_name.clone(),
                    result_id: ResultId::Ok,
                    properties: property_ids
                        .iter()
                        .map(|id| tag_property(tag, *id, return_values))
                        .collect(),
                },
                None => ItemPropertyCollection {
                    item_name: item.item_name.clone(),
                    result_id: ResultId::UnknownItemName,
                    properties: Vec::new(),
                },
            })
            .collect())
    }
}

fn tag_property(tag: &SimTag, id: u32, return_values: bool) -> ItemProperty {
    let (description, value) = match id {
        PROPERTY_DATA_TYPE => (
            "Item Canonical DataType",
            Some(Value::from(match &tag.value {
                Some(Value::Bool(_)) => "bool",
                Some(Value::I64(_)) => "i64",
                Some(Value::F64(_)) => "f64",
                Some(Value::String(_)) => "string",
                None => "empty",
            })),
        ),
        PROPERTY_VALUE => ("Item Value", tag.value.clone()),
        PROPERTY_QUALITY => ("Item Quality", Some(Value::I64(i64::from(tag.quality)))),
        PROPERTY_TIMESTAMP => ("Item Timestamp", Some(Value::String(tag.timestamp.to_rfc3339()))),
        PROPERTY_ACCESS_RIGHTS => (
            "Item Access Rights",
            Some(Value::from(if tag.writable {
                "readable,writable"
            } else {
                "readable"
            })),
        ),
        _ => {
            return ItemProperty {
                id,
                description: String::new(),
                value: None,
                result_id: ResultId::InvalidArgument,
            };
        }
    };
    ItemProperty {
        id,
        description: description.to_string(),
        value: if return_values { value } else { None },
        result_id: ResultId::Ok,
    }
}
