//! 历史数据访问的内存模拟服务器

use super::{Fault, Faults, lock_failed};
use crate::error::TransportError;
use crate::server::{HdaServer, ServerConnection};
use crate::types::{HdaItemHandle, HdaItemValue, ItemValueCollection};
use chrono::{DateTime, Utc};
use domain::{ResultId, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct HdaState {
    connected: bool,
    url: Option<String>,
    faults: Faults,
    archives: BTreeMap<String, Vec<HdaItemValue>>,
    handles: Vec<String>,
    read_calls: usize,
}

/// 历史数据访问内存服务器
pub struct InMemoryHdaServer {
    state: Mutex<HdaState>,
}

impl Default for InMemoryHdaServer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHdaServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HdaState::default()),
        }
    }

    /// 追加一条归档样本（按时间有序插入）
    pub fn with_sample(
        self,
        tag: impl Into<String>,
        timestamp: DateTime<Utc>,
        value: Option<Value>,
        quality: u16,
    ) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let archive = state.archives.entry(tag.into()).or_default();
            let index = archive.partition_point(|sample| sample.timestamp <= timestamp);
            archive.insert(
                index,
                HdaItemValue {
                    value,
                    timestamp,
                    quality,
                },
            );
        }
        self
    }

    /// 注入或清除某个操作的故障
    pub fn set_fault(&self, fault: Fault, message: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.set(fault, message.map(str::to_string));
        }
    }

    pub fn connected_url(&self) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.url.clone())
    }

    /// 原生 read_raw 调用次数（用于测试）
    pub fn read_calls(&self) -> usize {
        self.state.lock().map(|state| state.read_calls).unwrap_or(0)
    }
}

impl ServerConnection for InMemoryHdaServer {
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
        state.handles.clear();
        Ok(())
    }

    fn is_connected(&self) -> Result<bool, TransportError> {
        let state = self.state.lock().map_err(|_| lock_failed())?;
        state.faults.check(Fault::Status)?;
        Ok(state.connected)
    }
}

impl HdaServer for InMemoryHdaServer {
    fn create_items(&self, item_names: &[String]) -> Result<Vec<HdaItemHandle>, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        let mut handles = Vec::with_capacity(item_names.len());
        for name in item_names {
            state.handles.push(name.clone());
            let result_id = if state.archives.contains_key(name) {
                ResultId::Ok
            } else {
                ResultId::UnknownItemName
            };
            handles.push(HdaItemHandle {
                item_name: name.clone(),
                server_handle: state.handles.len() as u64,
                result_id,
            });
        }
        Ok(handles)
    }

    fn read_raw(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_values: u32,
        include_bounds: bool,
        items: &[HdaItemHandle],
    ) -> Result<Vec<ItemValueCollection>, TransportError> {
        let mut state = self.state.lock().map_err(|_| lock_failed())?;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.faults.check(Fault::Read)?;
        state.read_calls += 1;

        let mut collections = Vec::with_capacity(items.len());
        for item in items {
            let known = state.handles.get((item.server_handle as usize).wrapping_sub(1));
            if known != Some(&item.item_name) {
                collections.push(empty_collection(item, ResultId::InvalidHandle, start_time, end_time));
                continue;
            }
            let Some(archive) = state.archives.get(&item.item_name) else {
                collections.push(empty_collection(item, ResultId::UnknownItemName, start_time, end_time));
                continue;
            };

            let first_inside = archive.partition_point(|sample| sample.timestamp < start_time);
            let first_after = archive.partition_point(|sample| sample.timestamp <= end_time);
            let from = if include_bounds {
                first_inside.saturating_sub(1)
            } else {
                first_inside
            };
            let to = if include_bounds {
                (first_after + 1).min(archive.len())
            } else {
                first_after
            };
            let mut values: Vec<HdaItemValue> = archive[from..to.max(from)].to_vec();
            let mut result_id = ResultId::Ok;
            if max_values > 0 && values.len() > max_values as usize {
                values.truncate(max_values as usize);
                result_id = ResultId::MoreData;
            }
            if values.is_empty() {
                result_id = ResultId::NoData;
            }
            collections.push(ItemValueCollection {
                item_name: item.item_name.clone(),
                result_id,
                start_time,
                end_time,
                values,
            });
        }
        Ok(collections)
    }
}

fn empty_collection(
    item: &HdaItemHandle,
    result_id: ResultId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> ItemValueCollection {
    ItemValueCollection {
        item_name: item.item_name.clone(),
        result_id,
        start_time,
        end_time,
        values: Vec::new(),
    }
}
