//! 内存模拟服务器
//!
//! 仅用于本地测试和演示：行为贴近真实 OPC 服务器，
//! 并支持按操作注入故障。

mod da;
mod hda;

pub use da::{
    InMemoryDaServer, PROPERTY_ACCESS_RIGHTS, PROPERTY_DATA_TYPE, PROPERTY_QUALITY,
    PROPERTY_TIMESTAMP, PROPERTY_VALUE,
};
pub use hda::InMemoryHdaServer;

use crate::error::TransportError;
use std::collections::HashMap;

/// 可注入故障的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Connect,
    Disconnect,
    Status,
    Read,
    Write,
    Subscribe,
}

#[derive(Debug, Default)]
struct Faults {
    armed: HashMap<Fault, String>,
}

impl Faults {
    fn set(&mut self, fault: Fault, message: Option<String>) {
        match message {
            Some(message) => {
                self.armed.insert(fault, message);
            }
            None => {
                self.armed.remove(&fault);
            }
        }
    }

    fn check(&self, fault: Fault) -> Result<(), TransportError> {
        match self.armed.get(&fault) {
            Some(message) if fault == Fault::Connect => {
                Err(TransportError::Connection(message.clone()))
            }
            Some(message) => Err(TransportError::Server(message.clone())),
            None => Ok(()),
        }
    }
}

fn lock_failed() -> TransportError {
    TransportError::Server("lock failed".to_string())
}
