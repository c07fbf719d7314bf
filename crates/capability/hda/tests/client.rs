use chrono::{DateTime, TimeZone, Utc};
use domain::{EndpointAddress, Outcome, ResultId, Value};
use opc_hda::{ClientError, ErrorKind, FilterMode, HdaClient, SeriesQuery};
use opc_transport::{
    Fault, HdaItemHandle, HdaServer, InMemoryHdaServer, ItemValueCollection, ServerConnection,
    TransportError,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0)
        .single()
        .expect("valid time")
}

fn server() -> Arc<InMemoryHdaServer> {
    Arc::new(
        InMemoryHdaServer::new()
            .with_sample("Flow", at(0), Some(Value::F64(1.0)), 192)
            .with_sample("Flow", at(10), Some(Value::F64(2.0)), 0)
            .with_sample("Flow", at(20), Some(Value::F64(3.0)), 192)
            .with_sample("Flow", at(30), None, 192)
            .with_sample("Level", at(15), Some(Value::I64(7)), 192),
    )
}

fn client(server: &Arc<InMemoryHdaServer>) -> HdaClient {
    HdaClient::with_name(
        "history",
        EndpointAddress::new("LOCALHOST", "Sim.HDA.1"),
        server.clone(),
    )
}

#[test]
fn connect_uses_hda_url() {
    let server = server();
    let client = client(&server);
    client.connect().expect("connect");
    assert_eq!(
        server.connected_url().as_deref(),
        Some("opchda://127.0.0.1/Sim.HDA.1")
    );
    assert_eq!(client.is_connected(), Ok(true));
}

#[test]
fn read_raw_requires_connection() {
    let server = server();
    let client = client(&server);
    let err = client
        .read_raw(&["Flow"], at(0), at(30), 0, false)
        .expect_err("not connected");
    assert_eq!(err, ClientError::NotConnected);
    assert_eq!(server.read_calls(), 0);
}

#[test]
fn read_raw_returns_series_per_tag_in_order() {
    let server = server();
    let client = client(&server);
    client.connect().expect("connect");

    let series = client
        .read_raw(&["Level", "Flow", "Missing"], at(5), at(25), 0, true)
        .expect("read");
    assert_eq!(server.read_calls(), 1);
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].tag(), "Level");
    assert_eq!(series[1].start_time(), at(5));
    assert_eq!(series[1].end_time(), at(25));
    // 带边界：10:00 与 10:30 也被返回
    assert_eq!(series[1].len(), 4);
    assert_eq!(series[2].result_id(), &ResultId::UnknownItemName);
    assert!(!series[2].outcome().success);

    let good = series[1].points().filter(FilterMode::GoodAndNotNull);
    assert_eq!(good.len(), 2);
    let closest = series[1].points().find_closest(at(12)).expect("closest");
    assert_eq!(closest.timestamp, at(10));
}

#[test]
fn max_values_limits_series() {
    let server = server();
    let client = client(&server);
    client.connect().expect("connect");
    let series = client
        .read_raw(&["Flow"], at(0), at(30), 2, false)
        .expect("read");
    assert_eq!(series[0].len(), 2);
    assert_eq!(series[0].result_id(), &ResultId::MoreData);
}

#[test]
fn native_failure_is_reported() {
    let server = server();
    let client = client(&server);
    client.connect().expect("connect");
    server.set_fault(Fault::Read, Some("E_FAIL"));
    let err = client
        .read_raw(&["Flow"], at(0), at(30), 0, false)
        .expect_err("read fails");
    assert_eq!(err.kind(), ErrorKind::TransportException);
}

#[tokio::test]
async fn async_read_raw_honours_cancellation() {
    let server = server();
    let client = client(&server);
    client.connect().expect("connect");
    let token = CancellationToken::new();
    let series = client
        .read_raw_async(vec!["Flow".to_string()], at(0), at(30), 0, false, &token)
        .await
        .expect("read");
    assert_eq!(series[0].len(), 4);

    token.cancel();
    let err = client
        .read_raw_async(vec!["Flow".to_string()], at(0), at(30), 0, false, &token)
        .await
        .expect_err("cancelled");
    assert_eq!(err, ClientError::Cancelled);
    assert_eq!(server.read_calls(), 1);
}

/// 只返回第一个条目结果的服务器
struct ShortReplyServer {
    inner: Arc<InMemoryHdaServer>,
}

impl ServerConnection for ShortReplyServer {
    fn connect(&self, url: &str) -> Result<(), TransportError> {
        self.inner.connect(url)
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.inner.disconnect()
    }

    fn is_connected(&self) -> Result<bool, TransportError> {
        self.inner.is_connected()
    }
}

impl HdaServer for ShortReplyServer {
    fn create_items(&self, item_names: &[String]) -> Result<Vec<HdaItemHandle>, TransportError> {
        self.inner.create_items(item_names)
    }

    fn read_raw(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_values: u32,
        include_bounds: bool,
        items: &[HdaItemHandle],
    ) -> Result<Vec<ItemValueCollection>, TransportError> {
        let mut collections =
            self.inner
                .read_raw(start_time, end_time, max_values, include_bounds, items)?;
        collections.truncate(1);
        Ok(collections)
    }
}

#[test]
fn short_server_reply_is_rejected() {
    let client = HdaClient::new(
        EndpointAddress::new("localhost", "Sim.HDA.1"),
        Arc::new(ShortReplyServer { inner: server() }),
    );
    client.connect().expect("connect");
    let err = client
        .read_raw(&["Flow", "Level"], at(0), at(30), 0, false)
        .expect_err("short reply");
    assert_eq!(err.kind(), ErrorKind::TransportException);
    assert!(err.to_string().contains("expected 2 series, got 1"));

    let single = client
        .read_raw(&["Flow"], at(0), at(30), 0, false)
        .expect("read");
    assert_eq!(single.len(), 1);
}
