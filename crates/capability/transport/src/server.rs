//! 原生服务器接口
//!
//! OPC DA/HDA 服务器调用是阻塞的（COM/DCOM），接口因此是同步的；
//! 异步调用方由客户端负责放到阻塞线程池上执行。

use crate::error::TransportError;
use crate::types::{
    BrowseFilters, BrowseResult, HdaItemHandle, IdentifiedResult, ItemIdentifier,
    ItemPropertyCollection, ItemValue, ItemValueCollection, ItemValueResult, NotificationSink,
    SubscriptionHandle, SubscriptionInfo, SubscriptionState,
};
use chrono::{DateTime, Utc};

/// 连接生命周期原语（DA 与 HDA 共用）
pub trait ServerConnection: Send + Sync {
    /// 连接到 `opcda://host/server` 或 `opchda://host/server`
    fn connect(&self, url: &str) -> Result<(), TransportError>;

    fn disconnect(&self) -> Result<(), TransportError>;

    fn is_connected(&self) -> Result<bool, TransportError>;
}

/// 实时数据访问服务器
pub trait DaServer: ServerConnection {
    /// 按条目读取，结果与输入一一对应且同序
    fn read(&self, items: &[ItemIdentifier]) -> Result<Vec<ItemValueResult>, TransportError>;

    /// 按名称写入，结果与输入一一对应且同序
    fn write(&self, values: &[ItemValue]) -> Result<Vec<IdentifiedResult>, TransportError>;

    /// 创建订阅组；组内条目的变化通过 `sink` 推送
    fn create_subscription(
        &self,
        state: &SubscriptionState,
        sink: NotificationSink,
    ) -> Result<SubscriptionHandle, TransportError>;

    /// 向订阅组添加条目，返回的结果携带服务器句柄
    fn add_items(
        &self,
        group: SubscriptionHandle,
        items: &[ItemIdentifier],
    ) -> Result<Vec<IdentifiedResult>, TransportError>;

    /// 通过订阅组按服务器句柄写入
    fn write_group(
        &self,
        group: SubscriptionHandle,
        values: &[ItemValue],
    ) -> Result<Vec<IdentifiedResult>, TransportError>;

    /// 取消订阅组，并丢弃该组的推送发送端
    fn cancel_subscription(&self, group: SubscriptionHandle) -> Result<(), TransportError>;

    fn subscriptions(&self) -> Result<Vec<SubscriptionInfo>, TransportError>;

    fn browse(
        &self,
        item: Option<&ItemIdentifier>,
        filters: &BrowseFilters,
        continuation: Option<&str>,
    ) -> Result<BrowseResult, TransportError>;

    fn get_properties(
        &self,
        items: &[ItemIdentifier],
        property_ids: &[u32],
        return_values: bool,
    ) -> Result<Vec<ItemPropertyCollection>, TransportError>;
}

/// 历史数据访问服务器
pub trait HdaServer: ServerConnection {
    fn create_items(&self, item_names: &[String]) -> Result<Vec<HdaItemHandle>, TransportError>;

    /// 原始历史读取；`max_values = 0` 表示不限制，
    /// `include_bounds` 要求服务器附带窗口边界外侧的样本
    fn read_raw(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_values: u32,
        include_bounds: bool,
        items: &[HdaItemHandle],
    ) -> Result<Vec<ItemValueCollection>, TransportError>;
}
