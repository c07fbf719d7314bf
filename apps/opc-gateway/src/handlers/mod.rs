//! Handlers 模块

pub mod history;
pub mod metrics;
pub mod realtime;
pub mod status;

pub use history::*;
pub use metrics::*;
pub use realtime::*;
pub use status::*;
