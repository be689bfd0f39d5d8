// src/core/backend/cluster.rs

//! `ClusterGateway`: the backend implementation used by the proxy binary.
//!
//! It learns the slot layout from `CLUSTER SLOTS` on the first reachable seed, routes each
//! call by the hash slot of its first argument, and follows `MOVED`/`ASK` redirections.
//! A seed that reports cluster support disabled is treated as a standalone server owning
//! every slot.

use super::Backend;
use super::pool::NodePool;
use super::slot::{NUM_SLOTS, get_slot};
use crate::config::BackendConfig;
use crate::core::ProxyError;
use crate::core::commands::CommandTable;
use crate::core::protocol::{Request, RespFrame};
use crate::core::state::LiveConfig;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotOwner {
    master: String,
    replicas: Vec<String>,
}

#[derive(Debug)]
struct Topology {
    slots: Vec<Option<Arc<SlotOwner>>>,
}

impl Topology {
    fn empty() -> Self {
        Self {
            slots: vec![None; NUM_SLOTS],
        }
    }

    fn standalone(addr: &str) -> Self {
        let owner = Arc::new(SlotOwner {
            master: addr.to_string(),
            replicas: Vec::new(),
        });
        Self {
            slots: vec![Some(owner); NUM_SLOTS],
        }
    }

    fn nodes(&self) -> BTreeSet<String> {
        let mut nodes = BTreeSet::new();
        for owner in self.slots.iter().flatten() {
            if !nodes.contains(&owner.master) {
                nodes.insert(owner.master.clone());
                nodes.extend(owner.replicas.iter().cloned());
            }
        }
        nodes
    }
}

/// Where one call is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Target {
    addr: String,
    replica: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Moved { slot: u16, addr: String },
    Ask { addr: String },
}

impl Redirect {
    fn parse(frame: &RespFrame) -> Option<Self> {
        let RespFrame::Error(msg) = frame else {
            return None;
        };
        let mut parts = msg.split_whitespace();
        let kind = parts.next()?;
        let slot = parts.next()?.parse::<u16>().ok()?;
        let addr = parts.next()?.to_string();
        match kind {
            "MOVED" => Some(Redirect::Moved { slot, addr }),
            "ASK" => Some(Redirect::Ask { addr }),
            _ => None,
        }
    }
}

pub struct ClusterGateway {
    seeds: Vec<String>,
    topology: RwLock<Topology>,
    pools: Mutex<HashMap<Target, Arc<NodePool>>>,
    live: Arc<LiveConfig>,
    settings: BackendConfig,
    readonly_commands: HashSet<&'static str>,
}

impl ClusterGateway {
    /// Builds the gateway and loads the slot layout from the first reachable seed.
    pub async fn connect(
        seeds: Vec<String>,
        settings: BackendConfig,
        live: Arc<LiveConfig>,
    ) -> Result<Self, ProxyError> {
        let readonly_commands = CommandTable::standard()
            .entries()
            .filter(|entry| entry.is_readonly())
            .map(|entry| entry.name)
            .collect();
        let gateway = Self {
            seeds,
            topology: RwLock::new(Topology::empty()),
            pools: Mutex::new(HashMap::new()),
            live,
            settings,
            readonly_commands,
        };
        gateway.refresh_topology().await?;
        Ok(gateway)
    }

    /// Reloads the slot layout, trying the seeds first and then every known node.
    pub async fn refresh_topology(&self) -> Result<(), ProxyError> {
        let mut candidates = self.seeds.clone();
        candidates.extend(self.topology.read().nodes());

        let mut last_err = None;
        for addr in candidates {
            match self.fetch_topology(&addr).await {
                Ok(topology) => {
                    let nodes = topology.nodes();
                    *self.topology.write() = topology;
                    info!("Loaded slot layout from {addr}: {} node(s)", nodes.len());
                    return Ok(());
                }
                Err(e) => {
                    warn!("Could not load slot layout from {addr}: {e}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ProxyError::Backend("no seed nodes configured".into())))
    }

    async fn fetch_topology(&self, addr: &str) -> Result<Topology, ProxyError> {
        let pool = self.pool_for(&Target {
            addr: addr.to_string(),
            replica: false,
        });
        match pool.call(&Request::from_parts(["CLUSTER", "SLOTS"])).await? {
            RespFrame::Array(entries) => parse_cluster_slots(&entries, addr),
            RespFrame::Error(msg) if msg.contains("cluster support disabled") => {
                info!("{addr} runs without cluster support, routing every slot to it");
                Ok(Topology::standalone(addr))
            }
            other => Err(ProxyError::Backend(format!(
                "unexpected CLUSTER SLOTS reply from {addr}: {other:?}"
            ))),
        }
    }

    fn pool_for(&self, target: &Target) -> Arc<NodePool> {
        self.pools
            .lock()
            .entry(target.clone())
            .or_insert_with(|| {
                Arc::new(NodePool::new(
                    &target.addr,
                    self.live.pool_size_per_node(),
                    self.settings.connect_timeout,
                    self.settings.io_timeout,
                    target.replica,
                ))
            })
            .clone()
    }

    /// Picks the node for a call. Read-only commands may go to a replica when `slave_ok`
    /// is on.
    fn route(&self, request: &Request) -> Result<Target, ProxyError> {
        let topology = self.topology.read();
        let owner = match request.args().first() {
            Some(key) => {
                let slot = get_slot(key);
                topology.slots[slot as usize]
                    .clone()
                    .ok_or_else(|| ProxyError::Backend(format!("slot {slot} is not served")))?
            }
            None => topology
                .slots
                .iter()
                .flatten()
                .next()
                .cloned()
                .ok_or_else(|| ProxyError::Backend("no backend node known".into()))?,
        };

        if self.live.slave_ok()
            && self.readonly_commands.contains(request.name())
            && let Some(replica) = owner.replicas.choose(&mut rand::thread_rng())
        {
            return Ok(Target {
                addr: replica.clone(),
                replica: true,
            });
        }
        Ok(Target {
            addr: owner.master.clone(),
            replica: false,
        })
    }

    /// Points `slot` at `addr`. An owner already known with that master is reused, so its
    /// replicas stay eligible for reads.
    fn apply_moved(&self, slot: u16, addr: &str) {
        let mut topology = self.topology.write();
        if topology
            .slots
            .get(slot as usize)
            .and_then(|entry| entry.as_ref())
            .is_some_and(|owner| owner.master == addr)
        {
            return;
        }
        debug!("Slot {slot} moved to {addr}");
        let owner = topology
            .slots
            .iter()
            .flatten()
            .find(|owner| owner.master == addr)
            .cloned()
            .unwrap_or_else(|| {
                Arc::new(SlotOwner {
                    master: addr.to_string(),
                    replicas: Vec::new(),
                })
            });
        if let Some(entry) = topology.slots.get_mut(slot as usize) {
            *entry = Some(owner);
        }
    }
}

#[async_trait]
impl Backend for ClusterGateway {
    async fn execute(&self, request: &Request) -> Result<RespFrame, ProxyError> {
        let mut target = self.route(request)?;
        let mut asking = false;

        for _ in 0..=self.settings.max_redirects {
            let pool = self.pool_for(&target);
            let reply = if asking {
                pool.call_asking(request).await?
            } else {
                pool.call(request).await?
            };

            match Redirect::parse(&reply) {
                Some(Redirect::Moved { slot, addr }) => {
                    self.apply_moved(slot, &addr);
                    target = Target {
                        addr,
                        replica: false,
                    };
                    asking = false;
                }
                Some(Redirect::Ask { addr }) => {
                    target = Target {
                        addr,
                        replica: false,
                    };
                    asking = true;
                }
                None => return Ok(reply),
            }
        }

        Err(ProxyError::Backend(format!(
            "too many redirections for '{}'",
            request.name()
        )))
    }

    fn node_addresses(&self) -> Vec<String> {
        self.topology.read().nodes().into_iter().collect()
    }

    async fn refresh_topology(&self) -> Result<(), ProxyError> {
        ClusterGateway::refresh_topology(self).await
    }
}

/// Parses a `CLUSTER SLOTS` reply: `[start, end, [host, port, ..], replicas..]` per range.
fn parse_cluster_slots(entries: &[RespFrame], seed: &str) -> Result<Topology, ProxyError> {
    let seed_host = seed.rsplit_once(':').map(|(h, _)| h).unwrap_or(seed);
    let bad = |what: &str| ProxyError::Backend(format!("malformed CLUSTER SLOTS reply: {what}"));

    let mut topology = Topology::empty();
    for entry in entries {
        let RespFrame::Array(fields) = entry else {
            return Err(bad("range is not an array"));
        };
        let (Some(RespFrame::Integer(start)), Some(RespFrame::Integer(end))) =
            (fields.first(), fields.get(1))
        else {
            return Err(bad("range bounds are not integers"));
        };
        if *start < 0 || *end < *start || *end as usize >= NUM_SLOTS {
            return Err(bad("range bounds out of order"));
        }

        let mut nodes = fields[2..].iter().map(|node| node_address(node, seed_host));
        let master = nodes.next().ok_or_else(|| bad("range has no master"))??;
        let replicas = nodes.collect::<Result<Vec<_>, _>>()?;

        let owner = Arc::new(SlotOwner { master, replicas });
        for slot in *start as usize..=*end as usize {
            topology.slots[slot] = Some(owner.clone());
        }
    }
    Ok(topology)
}

fn node_address(node: &RespFrame, seed_host: &str) -> Result<String, ProxyError> {
    let bad = || ProxyError::Backend("malformed node entry in CLUSTER SLOTS reply".into());
    let RespFrame::Array(fields) = node else {
        return Err(bad());
    };
    let host = match fields.first() {
        Some(RespFrame::BulkString(b)) => String::from_utf8_lossy(b).to_string(),
        Some(RespFrame::SimpleString(s)) => s.clone(),
        _ => return Err(bad()),
    };
    let Some(RespFrame::Integer(port)) = fields.get(1) else {
        return Err(bad());
    };
    // Nodes that do not know their own address report an empty host.
    let host = if host.is_empty() { seed_host.to_string() } else { host };
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::protocol::{Incoming, RequestCodec};
    use bytes::Bytes;
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_util::codec::Framed;

    fn node(host: &str, port: i64) -> RespFrame {
        RespFrame::Array(vec![
            RespFrame::BulkString(Bytes::copy_from_slice(host.as_bytes())),
            RespFrame::Integer(port),
        ])
    }

    #[test]
    fn parses_slot_ranges_with_replicas() {
        let reply = vec![
            RespFrame::Array(vec![
                RespFrame::Integer(0),
                RespFrame::Integer(8191),
                node("10.0.0.1", 7000),
                node("10.0.0.2", 7000),
            ]),
            RespFrame::Array(vec![
                RespFrame::Integer(8192),
                RespFrame::Integer(16383),
                node("", 7001),
            ]),
        ];
        let topology = parse_cluster_slots(&reply, "10.0.0.9:7001").unwrap();
        let first = topology.slots[0].clone().unwrap();
        assert_eq!(first.master, "10.0.0.1:7000");
        assert_eq!(first.replicas, vec!["10.0.0.2:7000"]);
        let last = topology.slots[16383].clone().unwrap();
        assert_eq!(last.master, "10.0.0.9:7001");
        assert_eq!(
            topology.nodes().into_iter().collect::<Vec<_>>(),
            vec!["10.0.0.1:7000", "10.0.0.2:7000", "10.0.0.9:7001"]
        );
    }

    #[test]
    fn recognises_redirections() {
        assert_eq!(
            Redirect::parse(&RespFrame::Error("MOVED 3999 127.0.0.1:6381".into())),
            Some(Redirect::Moved {
                slot: 3999,
                addr: "127.0.0.1:6381".into()
            })
        );
        assert_eq!(
            Redirect::parse(&RespFrame::Error("ASK 3999 127.0.0.1:6381".into())),
            Some(Redirect::Ask {
                addr: "127.0.0.1:6381".into()
            })
        );
        assert_eq!(Redirect::parse(&RespFrame::Error("ERR boom".into())), None);
        assert_eq!(Redirect::parse(&RespFrame::ok()), None);
    }

    fn gateway_with(topology: Topology) -> ClusterGateway {
        ClusterGateway {
            seeds: Vec::new(),
            topology: RwLock::new(topology),
            pools: Mutex::new(HashMap::new()),
            live: Arc::new(LiveConfig::from_config(&Config::default())),
            settings: BackendConfig::default(),
            readonly_commands: HashSet::new(),
        }
    }

    fn owner_of(gateway: &ClusterGateway, slot: usize) -> SlotOwner {
        let topology = gateway.topology.read();
        SlotOwner::clone(topology.slots[slot].as_ref().unwrap())
    }

    #[test]
    fn moved_slots_keep_the_replicas_of_a_known_master() {
        let mut topology = Topology::empty();
        let a = Arc::new(SlotOwner {
            master: "10.0.0.1:7000".into(),
            replicas: vec!["10.0.0.2:7000".into()],
        });
        let b = Arc::new(SlotOwner {
            master: "10.0.0.3:7000".into(),
            replicas: vec!["10.0.0.4:7000".into()],
        });
        for slot in 0..NUM_SLOTS {
            topology.slots[slot] = Some(if slot < 8192 { a.clone() } else { b.clone() });
        }
        let gateway = gateway_with(topology);

        gateway.apply_moved(100, "10.0.0.3:7000");
        assert_eq!(owner_of(&gateway, 100), *b);

        gateway.apply_moved(200, "10.0.0.1:7000");
        assert_eq!(owner_of(&gateway, 200), *a);

        gateway.apply_moved(300, "10.0.0.5:7000");
        let moved = owner_of(&gateway, 300);
        assert_eq!(moved.master, "10.0.0.5:7000");
        assert!(moved.replicas.is_empty());
        assert!(gateway.node_addresses().contains(&"10.0.0.5:7000".to_string()));
    }

    /// A single-node server without cluster support that answers `GET` with the key name.
    async fn spawn_standalone_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut framed = Framed::new(socket, RequestCodec);
                    while let Some(Ok(Incoming::Request(req))) = framed.next().await {
                        let reply = match req.name() {
                            "CLUSTER" => RespFrame::Error(
                                "ERR This instance has cluster support disabled".into(),
                            ),
                            "GET" => RespFrame::BulkString(req.args()[0].clone()),
                            _ => RespFrame::ok(),
                        };
                        if framed.send(reply).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn standalone_node_serves_every_slot() {
        let addr = spawn_standalone_node().await;
        let live = Arc::new(LiveConfig::from_config(&Config::default()));
        let gateway = ClusterGateway::connect(vec![addr.clone()], BackendConfig::default(), live)
            .await
            .unwrap();

        assert_eq!(gateway.node_addresses(), vec![addr]);
        let reply = gateway
            .execute(&Request::from_parts(["GET", "foo"]))
            .await
            .unwrap();
        assert_eq!(reply, RespFrame::BulkString(Bytes::from_static(b"foo")));
    }

    #[tokio::test]
    async fn unreachable_seeds_fail_to_connect() {
        let live = Arc::new(LiveConfig::from_config(&Config::default()));
        let mut settings = BackendConfig::default();
        settings.connect_timeout = std::time::Duration::from_millis(200);
        let result =
            ClusterGateway::connect(vec!["127.0.0.1:1".to_string()], settings, live).await;
        assert!(matches!(result, Err(ProxyError::Backend(_))));
    }
}
