//! Integration tests for filters backed by a server query.

use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::json;
use sieve_store::{
    Adapter, Error, FilterConfig, Query, RecordData, Result, Store, StoreConfig, Value, ViewState,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Reply = LocalBoxFuture<'static, Result<Vec<RecordData>>>;

/// Records every query and answers from a queue of prepared replies.
#[derive(Clone, Default)]
struct TestAdapter {
    calls: Rc<RefCell<Vec<(String, Query, Query)>>>,
    replies: Rc<RefCell<VecDeque<Reply>>>,
}

impl TestAdapter {
    fn reply_with(&self, records: Vec<RecordData>) {
        self.replies
            .borrow_mut()
            .push_back(future::ready(Ok(records)).boxed_local());
    }

    fn fail_with(&self, message: &str) {
        let err = Error::fetch("person", message);
        self.replies
            .borrow_mut()
            .push_back(future::ready(Err(err)).boxed_local());
    }

    /// Queues a reply that resolves when the returned sender fires.
    fn reply_later(&self) -> oneshot::Sender<Vec<RecordData>> {
        let (tx, rx) = oneshot::channel();
        let reply = rx
            .map(|records| records.map_err(|_| Error::fetch("person", "canceled")))
            .boxed_local();
        self.replies.borrow_mut().push_back(reply);
        tx
    }
}

impl Adapter for TestAdapter {
    fn query(&self, model: &str, query: &Query, options: &Query) -> Reply {
        self.calls
            .borrow_mut()
            .push((model.to_string(), query.clone(), options.clone()));
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| future::ready(Ok(Vec::new())).boxed_local())
    }
}

fn setup() -> (Store, TestAdapter) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let adapter = TestAdapter::default();
    let store = Store::with_adapter(StoreConfig::default(), adapter.clone());
    store.define_model("person");
    (store, adapter)
}

fn query(pairs: &[(&str, Value)]) -> Query {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn tom_dale() -> RecordData {
    serde_json::from_value(json!({
        "id": "1", "type": "person", "attributes": { "name": "Tom Dale" }
    }))
    .unwrap()
}

#[test]
fn test_query_is_persisted_on_view() {
    let (store, adapter) = setup();
    adapter.reply_with(vec![tom_dale()]);

    let foo = query(&[("foo", Value::Int64(1))]);
    let pending = store
        .filter("person", FilterConfig::new(|_| true).with_query(foo.clone()))
        .unwrap();
    assert!(pending.is_fetching());
    assert_eq!(pending.view().state(), ViewState::Pending);

    let view = block_on(pending.resolve()).unwrap();
    assert_eq!(view.state(), ViewState::Ready);
    assert_eq!(view.query(), Some(foo));
}

#[test]
fn test_fetched_records_appear_in_view() {
    let (store, adapter) = setup();
    adapter.reply_with(vec![
        tom_dale(),
        RecordData::new("2", "person").attribute("name", "Yehuda Katz"),
    ]);

    let pending = store
        .filter(
            "person",
            FilterConfig::new(|r| r.get_str("name").is_some_and(|n| n.ends_with("Dale")))
                .with_query(query(&[("name", Value::from("Dale"))])),
        )
        .unwrap();
    assert!(pending.view().is_empty());

    let view = block_on(pending.resolve()).unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view.get(0).unwrap().remote_id(), Some("1"));
    assert_eq!(store.peek_all("person").unwrap().len(), 2);
}

#[test]
fn test_options_are_passed_to_adapter() {
    let (store, adapter) = setup();
    let options = query(&[("include", Value::from("embed"))]);

    let pending = store
        .filter(
            "person",
            FilterConfig::new(|_| true)
                .with_query(Query::new())
                .with_options(options.clone()),
        )
        .unwrap();
    block_on(pending.resolve()).unwrap();

    let calls = adapter.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ("person".to_string(), Query::new(), options));
}

#[test]
fn test_filter_without_query_does_not_fetch() {
    let (store, adapter) = setup();
    let pending = store.filter("person", FilterConfig::new(|_| true)).unwrap();
    assert!(!pending.is_fetching());

    let view = block_on(pending.resolve()).unwrap();
    assert!(view.is_ready());
    assert!(adapter.calls.borrow().is_empty());
}

#[test]
fn test_fetch_failure_keeps_view_usable() {
    let (store, adapter) = setup();
    store.create_record("person", [("name", "Tom Dale")]).unwrap();
    adapter.fail_with("server unavailable");

    let pending = store
        .filter("person", FilterConfig::new(|_| true).with_query(Query::new()))
        .unwrap();
    let view = pending.view().clone();

    let err = block_on(pending.resolve()).unwrap_err();
    assert_eq!(err, Error::fetch("person", "server unavailable"));
    assert_eq!(view.state(), ViewState::Ready);
    assert_eq!(view.len(), 1);

    store.create_record("person", [("name", "Yehuda Katz")]).unwrap();
    assert_eq!(view.len(), 2);
}

#[test]
fn test_query_without_adapter_fails_fetch() {
    let store = Store::default();
    store.define_model("person");

    let pending = store
        .filter("person", FilterConfig::all().with_query(Query::new()))
        .unwrap();
    let view = pending.view().clone();
    let err = block_on(pending.resolve()).unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));
    assert!(view.is_ready());
}

#[test]
fn test_destroy_during_fetch_is_not_resurrected() {
    let (store, adapter) = setup();
    let respond = adapter.reply_later();

    let pending = store
        .filter("person", FilterConfig::new(|_| true).with_query(Query::new()))
        .unwrap();
    let view = pending.view().clone();
    let other = store
        .filter("person", FilterConfig::all())
        .unwrap()
        .view()
        .clone();
    let resolving = pending.resolve();

    view.destroy();
    respond.send(vec![tom_dale()]).unwrap();

    let err = block_on(resolving).unwrap_err();
    assert_eq!(err, Error::view_destroyed("person"));
    assert_eq!(view.state(), ViewState::Destroyed);
    assert!(view.is_empty());

    // The fetched records still belong to the store.
    let tom = store.peek_record("person", "1").unwrap();
    assert_eq!(tom.get_str("name"), Some("Tom Dale"));
    assert_eq!(other.ids(), [tom.id()]);
}

#[test]
fn test_failed_fetch_for_destroyed_view() {
    let (store, adapter) = setup();
    adapter.fail_with("server unavailable");

    let pending = store
        .filter("person", FilterConfig::all().with_query(Query::new()))
        .unwrap();
    let view = pending.view().clone();
    view.destroy();

    let err = block_on(pending.resolve()).unwrap_err();
    assert_eq!(err, Error::view_destroyed("person"));
    assert_eq!(view.state(), ViewState::Destroyed);
}

#[test]
fn test_store_destroyed_during_fetch() {
    let (store, adapter) = setup();
    let respond = adapter.reply_later();

    let pending = store
        .filter("person", FilterConfig::new(|_| true).with_query(Query::new()))
        .unwrap();
    let view = pending.view().clone();

    store.destroy();
    respond.send(vec![tom_dale()]).unwrap();

    let err = block_on(pending.resolve()).unwrap_err();
    assert!(matches!(err, Error::ViewDestroyed { .. }));
    assert_eq!(view.state(), ViewState::Destroyed);
}

#[test]
fn test_local_records_visible_while_fetching() {
    let (store, adapter) = setup();
    store.create_record("person", [("name", "Tom Dale")]).unwrap();
    let respond = adapter.reply_later();

    let pending = store
        .filter("person", FilterConfig::new(|_| true).with_query(Query::new()))
        .unwrap();
    assert_eq!(pending.view().len(), 1);
    assert_eq!(pending.view().state(), ViewState::Pending);

    store.create_record("person", [("name", "Yehuda Katz")]).unwrap();
    assert_eq!(pending.view().len(), 2);

    respond.send(vec![tom_dale()]).unwrap();
    let view = block_on(pending.resolve()).unwrap();
    assert_eq!(view.len(), 3);
}
