// tests/integration/registry_test.rs

use super::test_helpers::{TestContext, test_config};
use spinelproxy::core::protocol::RespFrame;
use std::time::Duration;

#[tokio::test]
async fn idle_sessions_are_reaped_and_closed() {
    let ctx = TestContext::new().await;
    let mut idle = ctx.client().await;
    assert_eq!(idle.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    assert_eq!(ctx.state.sessions.len(), 1);

    // Below the admin range, but the live value is what the reaper reads.
    ctx.state.live.set_idle_timeout_secs(1);

    assert!(idle.is_closed().await);
    assert!(
        ctx.wait_until(Duration::from_secs(1), |state| state.sessions.is_empty())
            .await
    );

    ctx.shutdown().await;
}

#[tokio::test]
async fn active_sessions_survive_the_reaper() {
    let ctx = TestContext::new().await;
    ctx.state.live.set_idle_timeout_secs(1);
    let mut busy = ctx.client().await;

    for _ in 0..6 {
        assert_eq!(busy.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(ctx.state.sessions.len(), 1);

    ctx.shutdown().await;
}

#[tokio::test]
async fn connections_beyond_the_maximum_are_closed_without_registration() {
    let mut config = test_config();
    config.max_connections = 2;
    let ctx = TestContext::with_config(config).await;

    let mut first = ctx.client().await;
    let mut second = ctx.client().await;
    assert_eq!(first.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    assert_eq!(second.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));

    let mut third = ctx.client().await;
    assert!(third.is_closed().await);
    assert_eq!(ctx.state.sessions.len(), 2);
    assert_eq!(ctx.state.stats.get_rejected_connections(), 1);

    // A slot frees up once a client leaves.
    assert_eq!(first.send(&["QUIT"]).await, RespFrame::ok());
    assert!(
        ctx.wait_until(Duration::from_secs(1), |state| state.sessions.len() == 1)
            .await
    );
    let mut fourth = ctx.client().await;
    assert_eq!(fourth.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));

    ctx.shutdown().await;
}

#[tokio::test]
async fn client_disconnect_removes_the_session() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;
    assert_eq!(client.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    drop(client);

    assert!(
        ctx.wait_until(Duration::from_secs(1), |state| state.sessions.is_empty())
            .await
    );
    ctx.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_open_sessions() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;
    assert_eq!(client.send(&["PING"]).await, RespFrame::SimpleString("PONG".into()));
    let state = ctx.state.clone();

    ctx.shutdown().await;
    assert!(client.is_closed().await);
    assert!(state.sessions.is_empty());
}
