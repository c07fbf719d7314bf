//! # OPC HDA 历史数据访问
//!
//! - [`HdaClient`]：连接历史服务器并读取原始历史
//! - [`query`]：对已取回序列的只读查询（质量过滤、最近点、区间截取、前驱）
//!
//! 质量码 ≥ 192 视为 Good。

mod client;
pub mod query;

pub use client::HdaClient;
pub use opc_session::{ClientError, ErrorKind};
pub use query::{FilterMode, FindType, SeriesQuery};
