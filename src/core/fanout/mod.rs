// src/core/fanout/mod.rs

//! The fan-out engine: runs a multi-key command as independent single-key backend calls.
//!
//! Each sub-call runs as its own task. A semaphore of `parallelism` permits bounds how many
//! are in flight, and the engine always joins every task before merging, so a fan-out never
//! outlives the request it serves. Outcomes are merged in input order regardless of the
//! order in which sub-calls complete.

pub mod merge;

use crate::core::ProxyError;
use crate::core::backend::Backend;
use crate::core::commands::MultiKeyCommand;
use crate::core::metrics;
use crate::core::protocol::{Request, RespFrame};
use bytes::Bytes;
use merge::Outcome;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Drives the sub-calls of one session's multi-key commands.
#[derive(Clone)]
pub struct FanOutEngine {
    backend: Arc<dyn Backend>,
    parallelism: usize,
}

impl FanOutEngine {
    pub fn new(backend: Arc<dyn Backend>, parallelism: usize) -> Self {
        Self {
            backend,
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Serves `request` as the multi-key command `command` and returns the merged reply.
    pub async fn execute(&self, command: MultiKeyCommand, request: &Request) -> RespFrame {
        let args = request.args();
        match command {
            MultiKeyCommand::Mget => {
                let subs = args
                    .iter()
                    .map(|key| single("GET", std::slice::from_ref(key)))
                    .collect();
                merge::merge_mget(self.run_all(subs).await)
            }
            MultiKeyCommand::Mset => {
                if args.len() % 2 != 0 {
                    return RespFrame::error(&ProxyError::WrongArgumentCount("mset".into()));
                }
                let subs = args
                    .chunks_exact(2)
                    .map(|pair| single("SET", pair))
                    .collect();
                merge::merge_mset(self.run_all(subs).await)
            }
            MultiKeyCommand::Del => {
                let subs = args
                    .iter()
                    .map(|key| single("DEL", std::slice::from_ref(key)))
                    .collect();
                merge::merge_del(self.run_all(subs).await)
            }
            // Acknowledged without contacting the backend; nothing is modified.
            MultiKeyCommand::Msetnx
            | MultiKeyCommand::Rename
            | MultiKeyCommand::Renamenx
            | MultiKeyCommand::Rpoplpush
            | MultiKeyCommand::Sdiff
            | MultiKeyCommand::Sdiffstore
            | MultiKeyCommand::Sinter
            | MultiKeyCommand::Sinterstore
            | MultiKeyCommand::Smove
            | MultiKeyCommand::Zunionstore
            | MultiKeyCommand::Zinterstore => {
                debug!("{command} acknowledged without dispatch");
                RespFrame::ok()
            }
        }
    }

    /// Runs every sub-request and returns the outcomes in input order. Waits for all of
    /// them; a failing sub-call never cancels the others.
    pub async fn run_all(&self, subs: Vec<Request>) -> Vec<Outcome> {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut slots: Vec<Option<Outcome>> = vec![None; subs.len()];
        let mut tasks = JoinSet::new();

        for (idx, sub) in subs.into_iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    slots[idx] = Some(Err(ProxyError::Internal("fan-out gate closed".into())));
                    continue;
                }
            };
            let backend = self.backend.clone();
            metrics::FANOUT_SUBCALLS_TOTAL.inc();
            tasks.spawn(async move {
                let outcome = backend.execute(&sub).await;
                drop(permit);
                (idx, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => {
                    if merge::is_failure(&outcome) {
                        metrics::FANOUT_SUBCALL_FAILURES_TOTAL.inc();
                    }
                    slots[idx] = Some(outcome);
                }
                Err(e) => error!("Fan-out sub-call task failed: {e}"),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(ProxyError::Internal("sub-call did not finish".into())))
            })
            .collect()
    }
}

fn single(name: &'static str, args: &[Bytes]) -> Request {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(Bytes::from_static(name.as_bytes()));
    parts.extend(args.iter().cloned());
    Request::new(parts)
}
