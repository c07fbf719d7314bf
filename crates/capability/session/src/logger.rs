use tracing::Dispatch;

/// 组件级日志实例。
///
/// 组件在自身的公开操作内以该实例作为当前 dispatcher；
/// 默认是 `Dispatch::none()`，即不输出任何日志。
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl From<Dispatch> for Logger {
    fn from(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// 在该日志实例下执行 `f`。
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}
