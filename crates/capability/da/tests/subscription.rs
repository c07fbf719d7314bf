use domain::{DataPoint, EndpointAddress, Value};
use opc_da::{BrowseFilters, ClientError, DaClient, DataChangeCallback};
use opc_transport::in_memory::{PROPERTY_ACCESS_RIGHTS, PROPERTY_VALUE};
use opc_transport::{
    DaServer, IdentifiedResult, InMemoryDaServer, ItemIdentifier, ItemPropertyCollection,
    ItemValue, ItemValueResult, NotificationSink, ServerConnection, SubscriptionHandle,
    SubscriptionInfo, SubscriptionState, TransportError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

fn setup() -> (Arc<InMemoryDaServer>, DaClient) {
    let server = Arc::new(
        InMemoryDaServer::new()
            .with_tag("Boiler.Temp", 80.0)
            .with_tag("Boiler.Pressure", 3.0)
            .with_tag("Pump.Speed", 1200i64),
    );
    let client = DaClient::new(EndpointAddress::new("127.0.0.1", "Sim.DA.1"), server.clone());
    (server, client)
}

fn collector() -> (DataChangeCallback, Receiver<Vec<DataPoint>>) {
    let (tx, rx) = channel();
    let callback: DataChangeCallback = Arc::new(move |points: Vec<DataPoint>| {
        let _ = tx.send(points);
    });
    (callback, rx)
}

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn subscribe_requires_connected_server() {
    let (_server, client) = setup();
    let err = client
        .subscribe(&["Boiler.Temp"], "fast", 100, None)
        .expect_err("not connected");
    assert_eq!(err, ClientError::NotConnected);
    assert_eq!(client.subscription_names(), Ok(Vec::new()));
}

#[test]
fn callback_receives_only_changed_items() {
    let (server, client) = setup();
    client.connect().expect("connect");
    let (callback, rx) = collector();
    client
        .subscribe(&["Boiler.Temp", "Boiler.Pressure"], "boiler", 100, Some(callback))
        .expect("subscribe");

    server.set_value("Boiler.Pressure", 3.5, 192);
    let points = rx.recv_timeout(WAIT).expect("notification");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].tag, "Boiler.Pressure");
    assert_eq!(points[0].value, Some(Value::F64(3.5)));

    // 未订阅的标签不会触发回调
    server.set_value("Pump.Speed", 900i64, 192);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn resubscribe_same_name_adds_group_and_unsubscribe_removes_all() {
    let (server, client) = setup();
    client.connect().expect("connect");
    let (first, first_rx) = collector();
    let (second, second_rx) = collector();
    let a = client
        .subscribe(&["Boiler.Temp"], "fast", 100, Some(first))
        .expect("subscribe");
    let b = client
        .subscribe(&["Boiler.Temp"], "fast", 100, Some(second))
        .expect("subscribe");
    assert_ne!(a, b);
    assert_eq!(client.subscription_count(), 2);
    assert_eq!(
        client.subscription_names(),
        Ok(vec!["fast".to_string(), "fast".to_string()])
    );

    server.set_value("Boiler.Temp", 81.0, 192);
    assert!(first_rx.recv_timeout(WAIT).is_ok());
    assert!(second_rx.recv_timeout(WAIT).is_ok());

    client.unsubscribe("fast").expect("unsubscribe");
    assert_eq!(client.subscription_count(), 0);
    server.set_value("Boiler.Temp", 82.0, 192);
    assert!(first_rx.recv_timeout(Duration::from_millis(200)).is_err());

    // 再次取消同名订阅是空操作
    assert_eq!(client.unsubscribe("fast"), Ok(()));
}

#[test]
fn unsubscribe_all_with_no_groups_is_ok() {
    let (_server, client) = setup();
    client.connect().expect("connect");
    assert_eq!(client.unsubscribe_all(), Ok(()));
    client
        .subscribe(&["Boiler.Temp"], "a", 100, None)
        .expect("subscribe");
    client
        .subscribe(&["Pump.Speed"], "b", 500, None)
        .expect("subscribe");
    assert_eq!(client.subscription_count(), 2);
    assert_eq!(client.unsubscribe_all(), Ok(()));
    assert_eq!(client.subscription_count(), 0);
    assert_eq!(client.subscription_names(), Ok(Vec::new()));
}

#[test]
fn disconnect_clears_registered_groups() {
    let (_server, client) = setup();
    client.connect().expect("connect");
    client
        .subscribe(&["Boiler.Temp"], "fast", 100, None)
        .expect("subscribe");
    client.disconnect().expect("disconnect");
    assert_eq!(client.subscription_names(), Ok(Vec::new()));
    assert_eq!(client.subscription_count(), 0);
}

#[test]
fn browse_and_properties_pass_through() {
    let (_server, client) = setup();
    assert_eq!(
        client.browse(None, &BrowseFilters::default(), None),
        Err(ClientError::NotConnected)
    );
    client.connect().expect("connect");

    let root = client
        .browse(None, &BrowseFilters::default(), None)
        .expect("browse");
    let names: Vec<&str> = root.elements.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Boiler", "Pump"]);

    let properties = client
        .get_properties(&["Pump.Speed"], &[PROPERTY_VALUE, PROPERTY_ACCESS_RIGHTS], true)
        .expect("properties");
    assert_eq!(properties[0].properties.len(), 2);
    assert_eq!(properties[0].properties[0].value, Some(Value::I64(1200)));
}

/// 在内存服务器之上按次数注入取消订阅组与添加条目的失败
struct FlakyServer {
    inner: InMemoryDaServer,
    cancel_failures: AtomicUsize,
    add_failures: AtomicUsize,
}

impl FlakyServer {
    fn new(inner: InMemoryDaServer) -> Self {
        Self {
            inner,
            cancel_failures: AtomicUsize::new(0),
            add_failures: AtomicUsize::new(0),
        }
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl ServerConnection for FlakyServer {
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

impl DaServer for FlakyServer {
    fn read(&self, items: &[ItemIdentifier]) -> Result<Vec<ItemValueResult>, TransportError> {
        self.inner.read(items)
    }

    fn write(&self, values: &[ItemValue]) -> Result<Vec<IdentifiedResult>, TransportError> {
        self.inner.write(values)
    }

    fn create_subscription(
        &self,
        state: &SubscriptionState,
        sink: NotificationSink,
    ) -> Result<SubscriptionHandle, TransportError> {
        self.inner.create_subscription(state, sink)
    }

    fn add_items(
        &self,
        group: SubscriptionHandle,
        items: &[ItemIdentifier],
    ) -> Result<Vec<IdentifiedResult>, TransportError> {
        if Self::take(&self.add_failures) {
            return Err(TransportError::Server("add rejected".to_string()));
        }
        self.inner.add_items(group, items)
    }

    fn write_group(
        &self,
        group: SubscriptionHandle,
        values: &[ItemValue],
    ) -> Result<Vec<IdentifiedResult>, TransportError> {
        self.inner.write_group(group, values)
    }

    fn cancel_subscription(&self, group: SubscriptionHandle) -> Result<(), TransportError> {
        if Self::take(&self.cancel_failures) {
            return Err(TransportError::Server("transient".to_string()));
        }
        self.inner.cancel_subscription(group)
    }

    fn subscriptions(&self) -> Result<Vec<SubscriptionInfo>, TransportError> {
        self.inner.subscriptions()
    }

    fn browse(
        &self,
        item: Option<&ItemIdentifier>,
        filters: &BrowseFilters,
        continuation: Option<&str>,
    ) -> Result<opc_transport::BrowseResult, TransportError> {
        self.inner.browse(item, filters, continuation)
    }

    fn get_properties(
        &self,
        items: &[ItemIdentifier],
        property_ids: &[u32],
        return_values: bool,
    ) -> Result<Vec<ItemPropertyCollection>, TransportError> {
        self.inner.get_properties(items, property_ids, return_values)
    }
}

fn flaky_setup() -> (Arc<FlakyServer>, DaClient) {
    let server = Arc::new(FlakyServer::new(
        InMemoryDaServer::new().with_tag("Boiler.Temp", 80.0),
    ));
    let client = DaClient::new(EndpointAddress::new("127.0.0.1", "Sim.DA.1"), server.clone());
    (server, client)
}

#[test]
fn failed_cancel_keeps_group_registered_for_retry() {
    let (server, client) = flaky_setup();
    client.connect().expect("connect");
    let (callback, rx) = collector();
    client
        .subscribe(&["Boiler.Temp"], "fast", 100, Some(callback))
        .expect("subscribe");

    server.cancel_failures.store(1, Ordering::SeqCst);
    let err = client.unsubscribe("fast").expect_err("cancel fails");
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(client.subscription_names(), Ok(vec!["fast".to_string()]));
    assert_eq!(client.subscription_count(), 1);

    // 组仍在服务器上，推送照常回调
    server.inner.set_value("Boiler.Temp", 81.0, 192);
    assert!(rx.recv_timeout(WAIT).is_ok());

    client.unsubscribe("fast").expect("retry");
    assert_eq!(client.subscription_names(), Ok(Vec::new()));
    assert_eq!(client.subscription_count(), 0);
}

#[test]
fn failed_cancel_is_retried_by_unsubscribe_all() {
    let (server, client) = flaky_setup();
    client.connect().expect("connect");
    client
        .subscribe(&["Boiler.Temp"], "a", 100, None)
        .expect("subscribe");
    client
        .subscribe(&["Boiler.Temp"], "b", 100, None)
        .expect("subscribe");

    server.cancel_failures.store(1, Ordering::SeqCst);
    assert!(client.unsubscribe_all().is_err());
    assert_eq!(client.subscription_count(), 1);
    assert_eq!(client.subscription_names().map(|names| names.len()), Ok(1));

    assert_eq!(client.unsubscribe_all(), Ok(()));
    assert_eq!(client.subscription_count(), 0);
}

#[test]
fn subscribe_reports_add_failure_even_when_cleanup_fails() {
    let (server, client) = flaky_setup();
    client.connect().expect("connect");
    server.add_failures.store(1, Ordering::SeqCst);
    server.cancel_failures.store(1, Ordering::SeqCst);

    let err = client
        .subscribe(&["Boiler.Temp"], "fast", 100, None)
        .expect_err("add fails");
    assert_eq!(
        err,
        ClientError::Transport(TransportError::Server("add rejected".to_string()))
    );
    assert_eq!(client.subscription_names(), Ok(Vec::new()));
    // 清理失败的组留在服务器上
    assert_eq!(client.subscription_count(), 1);
}
