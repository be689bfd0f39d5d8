// src/core/commands/proxy/info.rs

use crate::core::protocol::RespFrame;
use crate::core::state::ProxyState;

/// `PROXY INFO`: identity, listening port, throughput, connections and advertised nodes,
/// one `field:value` line per array element, followed by one element per node.
pub fn proxy_info(state: &ProxyState) -> RespFrame {
    let config = &state.config;
    let live = &state.live;
    let mut lines = vec![
        format!("name:{}", config.name),
        format!("id:{}", config.id),
        format!("version:{}", env!("CARGO_PKG_VERSION")),
        format!("port:{}", config.port),
        format!("metrics:{}", live.metrics_addr()),
        format!("uptime:{}", state.uptime_secs()),
        format!("qps:{}", state.stats.last_qps()),
        format!("conns:{}", state.sessions.len()),
        "nodes:".to_string(),
    ];
    lines.extend(live.nodes());

    RespFrame::Array(
        lines
            .into_iter()
            .map(|line| RespFrame::BulkString(line.into()))
            .collect(),
    )
}
