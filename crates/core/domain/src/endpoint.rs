use std::fmt;

/// 连接 URL 的协议前缀。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScheme {
    /// 实时数据访问：`opcda://`
    Da,
    /// 历史数据访问：`opchda://`
    Hda,
}

impl UrlScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlScheme::Da => "opcda",
            UrlScheme::Hda => "opchda",
        }
    }
}

/// OPC 服务器地址（主机 + 逻辑服务器名），构造后不可变。
///
/// 主机名 `localhost`（不区分大小写）会被映射为 `127.0.0.1`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    host: String,
    server_name: String,
}

impl EndpointAddress {
    pub fn new(host: impl Into<String>, server_name: impl Into<String>) -> Self {
        let host = host.into();
        let host = if host.eq_ignore_ascii_case("localhost") {
            "127.0.0.1".to_string()
        } else {
            host
        };
        Self {
            host,
            server_name: server_name.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// 交给传输层的连接 URL，例如 `opcda://127.0.0.1/Matrikon.OPC.Simulation`。
    pub fn url(&self, scheme: UrlScheme) -> String {
        format!("{}://{}/{}", scheme.as_str(), self.host, self.server_name)
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.server_name)
    }
}
