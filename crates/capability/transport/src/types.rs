//! 原生记录类型
//!
//! 与 OPC DA/HDA 原生 API 一一对应的朴素数据结构，由传输实现产出，
//! 客户端负责把它们转换为 domain 类型。

use chrono::{DateTime, Utc};
use domain::{DataPoint, HistorySeries, Outcome, ResultId, Value};
use tokio::sync::mpsc;

/// 服务器为条目分配的句柄
pub type ServerHandle = u64;

/// 条目标识（名称 + 可选的服务器句柄）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdentifier {
    pub item_name: String,
    pub server_handle: Option<ServerHandle>,
}

impl ItemIdentifier {
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            server_handle: None,
        }
    }
}

/// 待写入的条目值
#[derive(Debug, Clone, PartialEq)]
pub struct ItemValue {
    pub item: ItemIdentifier,
    pub value: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
    pub quality: u16,
}

/// 读取或推送得到的条目值
#[derive(Debug, Clone, PartialEq)]
pub struct ItemValueResult {
    pub item_name: String,
    pub value: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub quality: u16,
    pub result_id: ResultId,
}

impl ItemValueResult {
    pub fn to_data_point(&self) -> DataPoint {
        DataPoint::new(
            self.item_name.clone(),
            self.value.clone(),
            self.timestamp,
            self.quality,
        )
    }
}

impl Outcome for ItemValueResult {
    fn item_name(&self) -> &str {
        &self.item_name
    }

    fn result_id(&self) -> &ResultId {
        &self.result_id
    }
}

/// 写入或添加条目的逐项结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedResult {
    pub item_name: String,
    pub server_handle: Option<ServerHandle>,
    pub result_id: ResultId,
}

impl Outcome for IdentifiedResult {
    fn item_name(&self) -> &str {
        &self.item_name
    }

    fn result_id(&self) -> &ResultId {
        &self.result_id
    }
}

/// 订阅组句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// 订阅组参数
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionState {
    pub name: String,
    /// 刷新周期（毫秒）
    pub update_rate_ms: u32,
    pub active: bool,
    /// 死区（百分比，0 表示不过滤）
    pub deadband: f32,
}

impl SubscriptionState {
    pub fn new(name: impl Into<String>, update_rate_ms: u32) -> Self {
        Self {
            name: name.into(),
            update_rate_ms,
            active: true,
            deadband: 0.0,
        }
    }
}

/// 服务器上已存在的订阅组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub handle: SubscriptionHandle,
    pub name: String,
}

/// 一次原生数据变化通知
#[derive(Debug, Clone, PartialEq)]
pub struct DataChange {
    pub subscription: SubscriptionHandle,
    /// 仅用于关联，不参与路由
    pub request_handle: Option<u64>,
    pub values: Vec<ItemValueResult>,
}

/// 传输层推送通知的发送端，每个订阅组一个。
///
/// 传输实现在取消订阅组时丢弃发送端，接收方随之结束。
pub type NotificationSink = mpsc::UnboundedSender<DataChange>;

/// 浏览时的元素类型过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowseFilter {
    #[default]
    All,
    Branch,
    Item,
}

/// 浏览参数
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseFilters {
    /// 0 表示不限制
    pub max_elements: u32,
    pub element_filter: BrowseFilter,
    pub name_filter: Option<String>,
    pub return_property_values: bool,
}

/// 地址空间中的一个元素
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseElement {
    pub name: String,
    pub item_name: String,
    pub is_item: bool,
    pub has_children: bool,
}

/// 浏览结果；`continuation` 非空表示还有后续元素
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseResult {
    pub elements: Vec<BrowseElement>,
    pub continuation: Option<String>,
}

/// 条目属性
#[derive(Debug, Clone, PartialEq)]
pub struct ItemProperty {
    pub id: u32,
    pub description: String,
    pub value: Option<Value>,
    pub result_id: ResultId,
}

/// 单个条目的属性集合
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPropertyCollection {
    pub item_name: String,
    pub result_id: ResultId,
    pub properties: Vec<ItemProperty>,
}

/// HDA 条目句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdaItemHandle {
    pub item_name: String,
    pub server_handle: ServerHandle,
    pub result_id: ResultId,
}

/// HDA 历史样本
#[derive(Debug, Clone, PartialEq)]
pub struct HdaItemValue {
    pub value: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub quality: u16,
}

/// 单个条目的原始历史读取结果
#[derive(Debug, Clone, PartialEq)]
pub struct ItemValueCollection {
    pub item_name: String,
    pub result_id: ResultId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub values: Vec<HdaItemValue>,
}

impl ItemValueCollection {
    pub fn into_series(self) -> HistorySeries {
        let points = self
            .values
            .into_iter()
            .map(|sample| {
                DataPoint::new(
                    self.item_name.clone(),
                    sample.value,
                    sample.timestamp,
                    sample.quality,
                )
            })
            .collect();
        HistorySeries::new(
            self.item_name,
            self.result_id,
            self.start_time,
            self.end_time,
            points,
        )
    }
}

impl Outcome for ItemValueCollection {
    fn item_name(&self) -> &str {
        &self.item_name
    }

    fn result_id(&self) -> &ResultId {
        &self.result_id
    }
}
