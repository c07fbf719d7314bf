//! OPC 客户端共享的领域模型。
//!
//! - [`EndpointAddress`]：服务器地址（主机 + 逻辑服务器名）
//! - [`DataPoint`] / [`Value`]：带质量码的样本
//! - [`OperationOutcome`] / [`Outcome`]：逐项操作结果的统一形态
//! - [`HistorySeries`]：单个标签的历史序列

pub mod data;
pub mod endpoint;
pub mod history;
pub mod outcome;

pub use data::{DataPoint, QUALITY_GOOD, TagValue, Value};
pub use endpoint::{EndpointAddress, UrlScheme};
pub use history::HistorySeries;
pub use outcome::{OperationOutcome, Outcome, ReadResult, ResultId};
