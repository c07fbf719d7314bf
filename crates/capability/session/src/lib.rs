//! 连接会话与客户端公共设施。
//!
//! - [`ConnectionSession`]：单个服务器端点的连接生命周期，持有客户端唯一的互斥锁
//! - [`ClientError`] / [`ErrorKind`]：所有公开操作的统一错误类型
//! - [`Logger`]：按组件注入的日志实例，默认静默
//! - [`run_blocking`]：异步变体的阻塞线程池执行与取消检查

mod error;
mod logger;
mod session;
mod worker;

pub use error::{ClientError, ErrorKind};
pub use logger::Logger;
pub use session::{ConnectionSession, Lifecycle};
pub use worker::run_blocking;
