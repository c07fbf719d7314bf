//! 内存模拟服务器的演示数据
//!
//! 网关默认跑在模拟传输上；真实的 COM/DCOM 传输实现同样的 trait 即可替换。

use chrono::{DateTime, Duration, DurationRound, Utc};
use domain::Value;
use opc_transport::{InMemoryDaServer, InMemoryHdaServer};

/// 网关启动后自动订阅的标签
pub const MONITORED_TAGS: [&str; 2] = ["Plant.Boiler.Temperature", "Plant.Boiler.Pressure"];

/// 历史归档的样本数（每分钟一个）
const ARCHIVE_MINUTES: i64 = 60;

pub fn da_server() -> InMemoryDaServer {
    InMemoryDaServer::new()
        .with_tag("Plant.Boiler.Temperature", 81.5)
        .with_tag("Plant.Boiler.Pressure", 3.2)
        .with_tag("Plant.Pump.Speed", 1450i64)
        .with_tag("Plant.Pump.Running", true)
        .with_tag("Plant.Line.Setpoint", 75.0)
        .with_read_only_tag("Plant.Info.Version", "1.0.0")
}

/// 最近一小时的分钟级归档，每 15 个样本有一个 Bad 质量点
pub fn hda_server(now: DateTime<Utc>) -> InMemoryHdaServer {
    let end = now.duration_trunc(Duration::minutes(1)).unwrap_or(now);
    (0..ARCHIVE_MINUTES).fold(InMemoryHdaServer::new(), |server, minute| {
        let timestamp = end - Duration::minutes(ARCHIVE_MINUTES - 1 - minute);
        let quality = if minute % 15 == 14 { 0 } else { 192 };
        let step = (minute % 10) as f64;
        server
            .with_sample(
                "Plant.Boiler.Temperature",
                timestamp,
                Some(Value::F64(80.0 + step * 0.25)),
                quality,
            )
            .with_sample(
                "Plant.Boiler.Pressure",
                timestamp,
                Some(Value::F64(3.0 + step * 0.02)),
                quality,
            )
    })
}
