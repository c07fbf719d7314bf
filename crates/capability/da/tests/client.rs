use domain::{EndpointAddress, ResultId, TagValue, Value};
use opc_da::{ClientError, DaClient, DaClientConfig, ErrorKind};
use opc_transport::{Fault, InMemoryDaServer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn tag_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Line.Tag{i:02}")).collect()
}

fn server_with(count: usize) -> Arc<InMemoryDaServer> {
    let server = tag_names(count)
        .into_iter()
        .enumerate()
        .fold(InMemoryDaServer::new(), |server, (i, name)| {
            server.with_tag(name, i as i64)
        });
    Arc::new(server.with_read_only_tag("Line.Status", "running"))
}

fn client(server: &Arc<InMemoryDaServer>, max_items: usize) -> DaClient {
    DaClient::with_config(
        EndpointAddress::new("localhost", "Sim.DA.1"),
        server.clone(),
        DaClientConfig {
            name: "line".to_string(),
            max_operation_items_count: max_items,
        },
    )
}

#[test]
fn read_requires_connection() {
    let server = server_with(3);
    let client = client(&server, 10);
    let err = client.read(&tag_names(3)).expect_err("not connected");
    assert_eq!(err, ClientError::NotConnected);
    assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
    assert!(server.read_batches().is_empty());
}

#[test]
fn read_preserves_order_across_batches() {
    let server = server_with(12);
    let client = client(&server, 5);
    client.connect().expect("connect");

    let mut tags = tag_names(12);
    tags.reverse();
    let results = client.read(&tags).expect("read");
    assert_eq!(server.read_batches(), vec![5, 5, 2]);
    let names: Vec<&str> = results.iter().map(|r| r.point.tag.as_str()).collect();
    assert_eq!(names, tags.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(results[0].point.value, Some(Value::I64(11)));
    assert!(results.iter().all(|r| r.outcome.success));
}

#[test]
fn unknown_tag_is_reported_per_item() {
    let server = server_with(2);
    let client = client(&server, 10);
    client.connect().expect("connect");
    let results = client
        .read(&["Line.Tag00", "Line.Missing"])
        .expect("read");
    assert!(results[0].outcome.success);
    assert!(!results[1].outcome.success);
    assert_eq!(
        results[1].outcome.result_code,
        ResultId::UnknownItemName.to_string()
    );
    assert!(!results[1].point.is_good());
}

#[test]
fn batch_failure_fails_whole_read() {
    let server = server_with(4);
    let client = client(&server, 2);
    client.connect().expect("connect");
    server.set_fault(Fault::Read, Some("E_FAIL"));
    let err = client.read(&tag_names(4)).expect_err("read fails");
    assert_eq!(err.kind(), ErrorKind::TransportException);
}

#[test]
fn read_one_returns_single_result() {
    let server = server_with(1);
    let client = client(&server, 10);
    client.connect().expect("connect");
    let result = client.read_one("Line.Tag00").expect("read").expect("one");
    assert_eq!(result.point.value, Some(Value::I64(0)));
}

#[test]
fn write_preserves_order_and_stamps_good_quality() {
    let server = server_with(7);
    let client = client(&server, 3);
    client.connect().expect("connect");

    let mut values: Vec<TagValue> = tag_names(7)
        .into_iter()
        .map(|name| TagValue::new(name, 100i64))
        .collect();
    values.insert(2, TagValue::new("Line.Status", "stopped"));
    let outcomes = client.write(&values).expect("write");

    assert_eq!(server.write_batches(), vec![3, 3, 2]);
    let names: Vec<&str> = outcomes.iter().map(|o| o.item_name.as_str()).collect();
    assert_eq!(
        names,
        values.iter().map(|v| v.tag.as_str()).collect::<Vec<_>>()
    );
    assert!(!outcomes[2].success);
    assert_eq!(outcomes[2].result_code, ResultId::ReadOnly.to_string());
    assert_eq!(server.value("Line.Tag06"), Some(Value::I64(100)));

    let read = client.read_one("Line.Tag06").expect("read").expect("one");
    assert_eq!(read.point.quality, 192);
}

#[test]
fn write_by_group_matches_write_outcomes() {
    let server = server_with(5);
    let client = client(&server, 2);
    client.connect().expect("connect");

    let values = vec![
        TagValue::new("Line.Tag00", 1i64),
        TagValue::new("Line.Missing", 2i64),
        TagValue::new("Line.Status", "stopped"),
        TagValue::new("Line.Tag04", 4i64),
    ];
    let direct = client.write(&values).expect("write");
    let grouped = client.write_by_group(&values).expect("write by group");
    assert_eq!(direct, grouped);
    assert_eq!(server.value("Line.Tag04"), Some(Value::I64(4)));
    // 临时写入组在每批之后被取消
    assert_eq!(client.subscription_count(), 0);
}

#[test]
fn write_one_returns_single_outcome() {
    let server = server_with(1);
    let client = client(&server, 10);
    client.connect().expect("connect");
    let outcome = client
        .write_one("Line.Tag00", 42i64)
        .expect("write")
        .expect("one");
    assert!(outcome.success);
    assert_eq!(outcome.result_code, "S_OK");
}

#[test]
fn failed_disconnect_keeps_client_usable() {
    let server = server_with(1);
    let client = client(&server, 10);
    client.connect().expect("connect");
    server.set_fault(Fault::Disconnect, Some("RPC_E_DISCONNECTED"));
    assert!(client.disconnect().is_err());
    assert!(client.read_one("Line.Tag00").is_ok());
    server.set_fault(Fault::Disconnect, None);
    client.disconnect().expect("disconnect");
    assert_eq!(client.is_connected(), Ok(false));
}

#[tokio::test]
async fn async_read_honours_cancellation() {
    let server = server_with(3);
    let client = client(&server, 10);
    client.connect().expect("connect");

    let token = CancellationToken::new();
    let results = client
        .read_async(tag_names(3), &token)
        .await
        .expect("read");
    assert_eq!(results.len(), 3);

    token.cancel();
    let err = client
        .write_async(vec![TagValue::new("Line.Tag00", 9i64)], &token)
        .await
        .expect_err("cancelled");
    assert_eq!(err, ClientError::Cancelled);
    assert_eq!(server.value("Line.Tag00"), Some(Value::I64(0)));
    assert!(server.write_batches().is_empty());
}

#[tokio::test]
async fn async_write_variants_reach_server() {
    let server = server_with(2);
    let client = client(&server, 10);
    client.connect().expect("connect");
    let token = CancellationToken::new();

    let outcome = client
        .write_one_async("Line.Tag01".to_string(), Value::I64(7), &token)
        .await
        .expect("write")
        .expect("one");
    assert!(outcome.success);
    let grouped = client
        .write_by_group_async(vec![TagValue::new("Line.Tag00", 5i64)], &token)
        .await
        .expect("write by group");
    assert!(grouped[0].success);
    let read = client
        .read_one_async("Line.Tag00".to_string(), &token)
        .await
        .expect("read")
        .expect("one");
    assert_eq!(read.point.value, Some(Value::I64(5)));
}
