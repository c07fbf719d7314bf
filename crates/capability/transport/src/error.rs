//! 传输层错误类型定义

/// 原生传输错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// 服务器未连接
    #[error("server not connected")]
    NotConnected,

    /// 无效的订阅组或条目句柄
    #[error("invalid handle: {0}")]
    InvalidHandle(u64),

    /// 服务器返回的调用级错误
    #[error("server error: {0}")]
    Server(String),

    /// 通道关闭
    #[error("channel closed")]
    ChannelClosed,
}
