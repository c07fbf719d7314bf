//! 网关运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 网关运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub da_host: String,
    pub da_server: String,
    pub hda_host: String,
    pub hda_server: String,
    pub client_name: String,
    pub max_operation_items: usize,
    pub connect_on_start: bool,
    pub log_filter: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("OPC_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8090".to_string());
        let da_host = read_required("OPC_DA_HOST")?;
        let da_server = read_required("OPC_DA_SERVER")?;
        // HDA 端点缺省与 DA 端点相同
        let hda_host = read_optional("OPC_HDA_HOST").unwrap_or_else(|| da_host.clone());
        let hda_server = read_optional("OPC_HDA_SERVER").unwrap_or_else(|| da_server.clone());
        let client_name = read_optional("OPC_CLIENT_NAME").unwrap_or_else(|| "default".to_string());
        let max_operation_items = read_usize_with_default("OPC_MAX_OPERATION_ITEMS", 5000)?;
        if max_operation_items == 0 {
            return Err(ConfigError::Invalid(
                "OPC_MAX_OPERATION_ITEMS".to_string(),
                "0".to_string(),
            ));
        }
        let connect_on_start = read_bool_with_default("OPC_CONNECT_ON_START", true);
        let log_filter = read_optional("OPC_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            http_addr,
            da_host,
            da_server,
            hda_host,
            hda_server,
            client_name,
            max_operation_items,
            connect_on_start,
            log_filter,
        })
    }
}

fn read_required(key: &str) -> Result<String, ConfigError> {
    read_optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
