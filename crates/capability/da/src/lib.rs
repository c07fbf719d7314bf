//! # OPC DA 实时数据访问
//!
//! - [`batch`]：按服务器上限拆分批量请求
//! - [`DaClient`]：连接、批量读写、分组写入、订阅、浏览
//! - [`SubscriptionDispatcher`]：把原生推送转换为 `DataPoint` 并回调
//!
//! 所有公开操作返回 `Result<_, ClientError>`，逐项失败放在
//! `OperationOutcome` 中；异步变体在阻塞线程池上执行同一逻辑。

pub mod batch;
mod client;
mod dispatcher;

pub use client::{DEFAULT_MAX_OPERATION_ITEMS, DaClient, DaClientConfig};
pub use dispatcher::{DataChangeCallback, DispatcherHandle, SubscriptionDispatcher};
pub use opc_session::{ClientError, ErrorKind};
pub use opc_transport::{
    BrowseElement, BrowseFilter, BrowseFilters, BrowseResult, ItemProperty,
    ItemPropertyCollection, SubscriptionHandle,
};
