// tests/integration/fanout_test.rs

use super::test_helpers::{TestContext, bulk, error_text};
use spinelproxy::core::protocol::RespFrame;
use std::time::Duration;

#[tokio::test]
async fn mget_keeps_input_order_when_later_keys_answer_first() {
    let ctx = TestContext::new().await;
    ctx.backend.insert("k1", "v1");
    ctx.backend.insert("k3", "v3");
    ctx.backend.delay("k1", Duration::from_millis(150));
    ctx.backend.delay("k2", Duration::from_millis(75));
    let mut client = ctx.client().await;

    let reply = client.send(&["MGET", "k1", "k2", "k3"]).await;
    assert_eq!(
        reply,
        RespFrame::Array(vec![bulk("v1"), RespFrame::Null, bulk("v3")])
    );

    let names: Vec<String> = ctx
        .backend
        .calls()
        .iter()
        .map(|call| call.name().to_string())
        .collect();
    assert_eq!(names, vec!["GET", "GET", "GET"]);
    ctx.shutdown().await;
}

#[tokio::test]
async fn mset_reports_partial_failure_and_still_writes_the_rest() {
    let ctx = TestContext::new().await;
    ctx.backend.fail("b");
    let mut client = ctx.client().await;

    let reply = client.send(&["MSET", "a", "1", "b", "2", "c", "3"]).await;
    assert_eq!(
        error_text(&reply),
        "ERR 1 MSET failed, partial key/value 2 set"
    );
    assert_eq!(ctx.backend.value("a").as_deref(), Some(&b"1"[..]));
    assert_eq!(ctx.backend.value("b"), None);
    assert_eq!(ctx.backend.value("c").as_deref(), Some(&b"3"[..]));
    assert_eq!(ctx.backend.call_count(), 3);

    // A session that saw a partial failure keeps working.
    assert_eq!(client.send(&["MSET", "d", "4"]).await, RespFrame::ok());
    ctx.shutdown().await;
}

#[tokio::test]
async fn mset_with_a_dangling_key_is_rejected_before_any_write() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    let reply = client.send(&["MSET", "a", "1", "b"]).await;
    assert_eq!(
        error_text(&reply),
        "ERR wrong number of arguments for 'mset' command"
    );
    assert_eq!(ctx.backend.call_count(), 0);
    ctx.shutdown().await;
}

#[tokio::test]
async fn del_sums_the_per_key_counts() {
    let ctx = TestContext::new().await;
    ctx.backend.insert("k1", "x");
    ctx.backend.insert("k3", "z");
    let mut client = ctx.client().await;

    assert_eq!(
        client.send(&["DEL", "k1", "k2", "k3"]).await,
        RespFrame::Integer(2)
    );
    assert_eq!(ctx.backend.call_count(), 3);
    ctx.shutdown().await;
}

#[tokio::test]
async fn mget_sub_call_failure_is_embedded_in_its_slot() {
    let ctx = TestContext::new().await;
    ctx.backend.insert("a", "1");
    ctx.backend.fail("b");
    let mut client = ctx.client().await;

    let reply = client.send(&["MGET", "a", "b"]).await;
    let RespFrame::Array(items) = reply else {
        panic!("expected an array, got {reply:?}");
    };
    assert_eq!(items[0], bulk("1"));
    assert!(items[1].is_error());
    ctx.shutdown().await;
}
