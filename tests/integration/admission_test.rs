// tests/integration/admission_test.rs

use super::test_helpers::{TestContext, bulk, error_text};
use spinelproxy::core::protocol::RespFrame;
use std::time::Duration;

#[tokio::test]
async fn housekeeping_commands_are_answered_without_the_backend() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    assert_eq!(client.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    assert_eq!(client.send(&["select", "3"]).await, RespFrame::ok());
    assert_eq!(client.send(&["AUTH", "secret"]).await, RespFrame::ok());
    assert_eq!(
        client.send(&["ECHO", "hello\r\nworld"]).await,
        RespFrame::SimpleString("hello  world".into())
    );
    assert_eq!(
        error_text(&client.send(&["ECHO", "a", "b"]).await),
        "ERR wrong number of arguments for 'echo' command"
    );
    assert_eq!(ctx.backend.call_count(), 0);

    ctx.shutdown().await;
}

#[tokio::test]
async fn forbidden_unknown_and_bad_arity_requests_are_rejected() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    assert_eq!(
        error_text(&client.send(&["KEYS", "*"]).await),
        "ERR command 'keys' is forbidden by the proxy"
    );
    assert_eq!(
        error_text(&client.send(&["FLUSHALL"]).await),
        "ERR command 'flushall' is forbidden by the proxy"
    );
    assert_eq!(error_text(&client.send(&["NOSUCHCMD", "x"]).await), "ERR bad command");
    assert_eq!(
        error_text(&client.send(&["GET"]).await),
        "ERR wrong number of arguments for 'get' command"
    );
    assert_eq!(
        error_text(&client.send(&["GET", "a", "b"]).await),
        "ERR wrong number of arguments for 'get' command"
    );
    assert_eq!(ctx.backend.call_count(), 0);

    // The session survives every rejection.
    assert_eq!(client.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    ctx.shutdown().await;
}

#[tokio::test]
async fn admitted_requests_are_forwarded_verbatim() {
    let ctx = TestContext::new().await;
    ctx.backend.insert("greeting", "hi");
    let mut client = ctx.client().await;

    assert_eq!(client.send(&["get", "greeting"]).await, bulk("hi"));
    assert_eq!(client.send(&["GET", "missing"]).await, RespFrame::Null);
    assert_eq!(ctx.backend.call_count(), 2);

    ctx.shutdown().await;
}

#[tokio::test]
async fn blacked_key_is_refused_until_its_deadline_passes() {
    let ctx = TestContext::new().await;
    ctx.backend.insert("hot", "value");
    let mut client = ctx.client().await;

    assert_eq!(client.send(&["PROXY", "BLACK", "SET", "1", "hot"]).await, RespFrame::ok());
    assert_eq!(
        error_text(&client.send(&["GET", "hot"]).await),
        "ERR key 'hot' is blacked by the proxy"
    );
    // Only the first argument is checked.
    assert_eq!(client.send(&["GET", "other"]).await, RespFrame::Null);
    assert_eq!(ctx.backend.call_count(), 1);

    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(client.send(&["GET", "hot"]).await, bulk("value"));

    ctx.shutdown().await;
}

#[tokio::test]
async fn malformed_frames_get_an_error_and_the_session_stays_open() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    client.send_raw(b"*1\r\n:12\r\n").await;
    let reply = client.read().await.expect("an error reply");
    assert!(error_text(&reply).starts_with("ERR Protocol error"), "{reply:?}");

    assert_eq!(client.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    ctx.shutdown().await;
}

#[tokio::test]
async fn quit_acknowledges_and_closes_the_connection() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    assert_eq!(client.send(&["QUIT"]).await, RespFrame::ok());
    assert!(client.is_closed().await);
    assert!(
        ctx.wait_until(Duration::from_secs(1), |state| state.sessions.is_empty())
            .await
    );

    ctx.shutdown().await;
}
