// tests/integration/admin_test.rs

use super::test_helpers::{TestContext, bulk, error_text, test_config};
use spinelproxy::core::protocol::RespFrame;

fn lines(frame: &RespFrame) -> Vec<String> {
    let RespFrame::Array(items) = frame else {
        panic!("expected an array, got {frame:?}");
    };
    items
        .iter()
        .map(|item| match item {
            RespFrame::BulkString(b) => String::from_utf8_lossy(b).into_owned(),
            other => panic!("expected bulk strings, got {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn proxy_info_reports_identity_connections_and_nodes() {
    let mut config = test_config();
    config.nodes = vec!["10.0.0.1:7000".into(), "10.0.0.2:7000".into()];
    let ctx = TestContext::with_config(config).await;
    let mut client = ctx.client().await;
    let _second = ctx.client().await;
    assert!(
        ctx.wait_until(std::time::Duration::from_secs(1), |s| s.sessions.len() == 2)
            .await
    );

    let info = lines(&client.send(&["proxy", "info"]).await);
    assert_eq!(info[0], "name:test");
    assert_eq!(info[1], "id:test-proxy");
    assert!(info[2].starts_with("version:"));
    assert!(info.contains(&"conns:2".to_string()), "{info:?}");
    let nodes_at = info.iter().position(|l| l == "nodes:").expect("nodes line");
    assert_eq!(&info[nodes_at + 1..], ["10.0.0.1:7000", "10.0.0.2:7000"]);
    assert_eq!(ctx.backend.call_count(), 0);

    ctx.shutdown().await;
}

#[tokio::test]
async fn black_set_get_and_remove() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    assert_eq!(client.send(&["PROXY", "BLACK", "SET", "60", "zeta"]).await, RespFrame::ok());
    assert_eq!(client.send(&["PROXY", "BLACK", "SET", "60", "alpha"]).await, RespFrame::ok());
    assert_eq!(
        client.send(&["PROXY", "BLACK", "GET"]).await,
        RespFrame::Array(vec![bulk("alpha"), bulk("zeta")])
    );

    assert_eq!(client.send(&["PROXY", "BLACK", "REMOVE", "zeta"]).await, RespFrame::ok());
    assert_eq!(
        error_text(&client.send(&["PROXY", "BLACK", "REMOVE", "zeta"]).await),
        "ERR black key 'zeta' not found"
    );
    assert_eq!(
        error_text(&client.send(&["PROXY", "BLACK", "SET", "86401", "k"]).await),
        "ERR black time must be between 0 and 86400"
    );
    assert_eq!(
        error_text(&client.send(&["PROXY", "BLACK", "SET", "10"]).await),
        "ERR wrong number of arguments for 'proxy black set' command"
    );

    ctx.shutdown().await;
}

#[tokio::test]
async fn config_set_returns_the_previous_value_and_validates_ranges() {
    let ctx = TestContext::new().await;
    let mut client = ctx.client().await;

    assert_eq!(
        client.send(&["PROXY", "CONFIG", "GET", "idletime"]).await,
        RespFrame::Integer(300)
    );
    assert_eq!(
        client.send(&["PROXY", "CONFIG", "SET", "IDLETIME", "60"]).await,
        RespFrame::Integer(300)
    );
    assert_eq!(ctx.state.live.idle_timeout_secs(), 60);

    assert_eq!(
        error_text(&client.send(&["PROXY", "CONFIG", "SET", "idletime", "301"]).await),
        "ERR idletime must be between 5 and 300"
    );
    assert_eq!(
        error_text(&client.send(&["PROXY", "CONFIG", "SET", "maxconn", "99"]).await),
        "ERR maxconn must be between 100 and 60000"
    );
    assert_eq!(
        error_text(&client.send(&["PROXY", "CONFIG", "SET", "slaveok", "yes"]).await),
        "ERR slaveok must be 0 or 1"
    );
    assert_eq!(
        client.send(&["PROXY", "CONFIG", "SET", "slaveok", "1"]).await,
        RespFrame::Integer(0)
    );
    assert!(ctx.state.live.slave_ok());

    assert_eq!(
        client.send(&["PROXY", "CONFIG", "SET", "loglevel", "debug"]).await,
        bulk("info")
    );
    assert_eq!(ctx.state.live.log_level(), "debug");
    assert!(client.send(&["PROXY", "CONFIG", "SET", "loglevel", "loud"]).await.is_error());

    assert_eq!(
        client.send(&["PROXY", "CONFIG", "SET", "metrics", "127.0.0.1:9100"]).await,
        bulk("0.0.0.0:8878")
    );
    assert_eq!(
        client.send(&["PROXY", "CONFIG", "GET", "metrics"]).await,
        bulk("127.0.0.1:9100")
    );

    assert_eq!(
        error_text(&client.send(&["PROXY", "CONFIG", "SET", "poolsize", "50"]).await),
        "ERR poolsize is read-only"
    );
    assert_eq!(
        error_text(&client.send(&["PROXY", "CONFIG", "GET", "color"]).await),
        "ERR unknown proxy config name 'color'"
    );
    assert_eq!(
        error_text(&client.send(&["PROXY", "RESTART"]).await),
        "ERR unknown PROXY operation 'restart'"
    );

    ctx.shutdown().await;
}

#[tokio::test]
async fn mulparallel_change_applies_to_new_sessions() {
    let ctx = TestContext::new().await;
    let mut admin = ctx.client().await;

    assert_eq!(
        admin.send(&["PROXY", "CONFIG", "SET", "mulparallel", "4"]).await,
        RespFrame::Error("ERR mulparallel must be between 5 and 100".into())
    );
    assert_eq!(
        admin.send(&["PROXY", "CONFIG", "SET", "mulparallel", "20"]).await,
        RespFrame::Integer(10)
    );
    assert_eq!(ctx.state.live.fanout_parallelism(), 20);

    // Sessions keep working across the change.
    let mut later = ctx.client().await;
    assert_eq!(
        later.send(&["MGET", "a", "b"]).await,
        RespFrame::Array(vec![RespFrame::Null, RespFrame::Null])
    );
    ctx.shutdown().await;
}
