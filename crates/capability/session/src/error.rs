use opc_transport::TransportError;

/// 错误分类。
///
/// 逐项失败（OperationFailure 的常见形态）放在 `OperationOutcome` 中返回，
/// 不会作为调用级错误出现。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectionFailure,
    OperationFailure,
    TransportException,
}

/// 客户端调用级错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("connection failure: {0}")]
    Connection(String),
    #[error("server not connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Connection(_) | ClientError::NotConnected => ErrorKind::ConnectionFailure,
            ClientError::Cancelled | ClientError::InvalidArgument(_) => ErrorKind::OperationFailure,
            ClientError::Transport(_) | ClientError::Internal(_) => ErrorKind::TransportException,
        }
    }
}
