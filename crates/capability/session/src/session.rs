//! 连接会话
//!
//! 只做一次连接/断开尝试，不重试、不自动重连。传输层故障在这里被捕获、
//! 记录日志并转换为 [`ClientError::Connection`]。

use crate::error::ClientError;
use domain::{EndpointAddress, UrlScheme};
use opc_transport::ServerConnection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

/// 连接生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Disconnected,
    Connected,
}

struct SessionState<T> {
    lifecycle: Lifecycle,
    extra: T,
}

/// 单个服务器端点的连接会话。
///
/// `T` 是客户端挂在同一把锁下的附加状态（例如订阅组登记表），
/// 断开成功后重置为 `T::default()`。
pub struct ConnectionSession<S: ?Sized, T = ()> {
    name: String,
    endpoint: EndpointAddress,
    scheme: UrlScheme,
    server: Arc<S>,
    state: Mutex<SessionState<T>>,
}

impl<S, T> ConnectionSession<S, T>
where
    S: ServerConnection + ?Sized,
    T: Default,
{
    pub fn new(
        name: impl Into<String>,
        endpoint: EndpointAddress,
        scheme: UrlScheme,
        server: Arc<S>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint,
            scheme,
            server,
            state: Mutex::new(SessionState {
                lifecycle: Lifecycle::Disconnected,
                extra: T::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &EndpointAddress {
        &self.endpoint
    }

    pub fn server(&self) -> &Arc<S> {
        &self.server
    }

    pub fn url(&self) -> String {
        self.endpoint.url(self.scheme)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState<T>>, ClientError> {
        self.state
            .lock()
            .map_err(|_| ClientError::Internal("session lock poisoned".to_string()))
    }

    /// 已保存的生命周期状态（不访问传输层）
    pub fn lifecycle(&self) -> Result<Lifecycle, ClientError> {
        Ok(self.lock()?.lifecycle)
    }

    /// Disconnected → Connected。已连接时直接返回。
    pub fn connect(&self) -> Result<(), ClientError> {
        let mut state = self.lock()?;
        let url = self.url();
        if state.lifecycle == Lifecycle::Connected {
            debug!(target: "opc.session", client = %self.name, url = %url, "already connected");
            return Ok(());
        }
        info!(target: "opc.session", client = %self.name, url = %url, "connecting");
        match self.server.connect(&url) {
            Ok(()) => {
                state.lifecycle = Lifecycle::Connected;
                info!(target: "opc.session", client = %self.name, url = %url, "connected");
                Ok(())
            }
            Err(err) => {
                error!(
                    target: "opc.session",
                    client = %self.name,
                    url = %url,
                    error = %err,
                    "connect failed"
                );
                Err(ClientError::Connection(err.to_string()))
            }
        }
    }

    /// Connected → Disconnected。未连接时直接返回；失败时保持已连接状态。
    pub fn disconnect(&self) -> Result<(), ClientError> {
        let mut state = self.lock()?;
        if state.lifecycle == Lifecycle::Disconnected {
            return Ok(());
        }
        let url = self.url();
        info!(target: "opc.session", client = %self.name, url = %url, "disconnecting");
        match self.server.disconnect() {
            Ok(()) => {
                state.lifecycle = Lifecycle::Disconnected;
                state.extra = T::default();
                info!(target: "opc.session", client = %self.name, url = %url, "disconnected");
                Ok(())
            }
            Err(err) => {
                error!(
                    target: "opc.session",
                    client = %self.name,
                    url = %url,
                    error = %err,
                    "disconnect failed"
                );
                Err(ClientError::Connection(err.to_string()))
            }
        }
    }

    /// 询问传输层的连接状态。
    ///
    /// 传输层报错不会改变已保存的状态，调用方需要显式断开。
    pub fn is_connected(&self) -> Result<bool, ClientError> {
        if self.lifecycle()? == Lifecycle::Disconnected {
            debug!(target: "opc.session", client = %self.name, "status = disconnected");
            return Ok(false);
        }
        match self.server.is_connected() {
            Ok(connected) => {
                debug!(target: "opc.session", client = %self.name, connected, "status");
                Ok(connected)
            }
            Err(err) => {
                error!(
                    target: "opc.session",
                    client = %self.name,
                    error = %err,
                    "status query failed"
                );
                Err(ClientError::Connection(err.to_string()))
            }
        }
    }

    /// 已保存状态为 Connected，否则返回 [`ClientError::NotConnected`]
    pub fn ensure_connected(&self) -> Result<(), ClientError> {
        match self.lifecycle()? {
            Lifecycle::Connected => Ok(()),
            Lifecycle::Disconnected => Err(ClientError::NotConnected),
        }
    }

    /// 在会话锁内访问生命周期状态与附加状态
    pub fn with_state<R>(&self, f: impl FnOnce(Lifecycle, &mut T) -> R) -> Result<R, ClientError> {
        let mut state = self.lock()?;
        let lifecycle = state.lifecycle;
        Ok(f(lifecycle, &mut state.extra))
    }
}

impl<S: ?Sized, T> std::fmt::Debug for ConnectionSession<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
