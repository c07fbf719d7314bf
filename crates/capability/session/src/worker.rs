//! 阻塞线程池执行器（异步读写变体共用）

use crate::error::ClientError;
use tokio_util::sync::CancellationToken;

/// 在 `spawn_blocking` 上执行同步操作。
///
/// 取消只在两个位置检查：交给阻塞线程池之前、工作线程开始执行时。
/// 已开始的批次不会被中途打断。
pub async fn run_blocking<R, F>(token: &CancellationToken, op: F) -> Result<R, ClientError>
where
    F: FnOnce() -> Result<R, ClientError> + Send + 'static,
    R: Send + 'static,
{
    if token.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    let token = token.clone();
    tokio::task::spawn_blocking(move || {
        if token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        op()
    })
    .await
    .map_err(|err| ClientError::Internal(format!("blocking worker failed: {err}")))?
}
