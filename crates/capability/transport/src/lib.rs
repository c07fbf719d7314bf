//! # OPC 传输边界
//!
//! 客户端与 OPC 服务器之间的原生接口。真实的 COM/DCOM 会话属于外部协作方，
//! 本 crate 只定义它需要提供的原语，并附带用于测试与演示的内存模拟实现。
//!
//! ## 架构设计
//!
//! ```text
//! DaClient / HdaClient
//!       │
//!       ▼
//! ConnectionSession（生命周期 + 锁）
//!       │
//!       ├── DaServer  ── read / write / subscribe / browse
//!       └── HdaServer ── create_items / read_raw
//!       │
//!       ▼
//! 具体传输实现（COM 桥接 / InMemory*Server）
//! ```
//!
//! 推送通知走每个订阅组独立的 `mpsc` 通道：传输实现持有发送端，
//! 取消订阅组即丢弃发送端。

mod error;
pub mod in_memory;
mod server;
mod types;

pub use error::TransportError;
pub use in_memory::{Fault, InMemoryDaServer, InMemoryHdaServer};
pub use server::{DaServer, HdaServer, ServerConnection};
pub use types::*;
