// src/core/state/registry.rs

//! The session registry: which client sessions are alive, keyed by remote address.
//!
//! Insertion (accept path), removal (session close) and reaping (idle sweep) all happen
//! under the same lock. Each entry carries a kill channel so the reaper can close the
//! connection it removed.

use crate::core::metrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

pub type ShutdownSender = broadcast::Sender<()>;

/// Last-access clock of one session, stored as milliseconds since the registry epoch so it
/// can be refreshed without taking the registry lock.
#[derive(Debug)]
pub struct SessionActivity {
    epoch: Instant,
    last_access_ms: AtomicU64,
}

impl SessionActivity {
    fn new(epoch: Instant) -> Self {
        let activity = Self {
            epoch,
            last_access_ms: AtomicU64::new(0),
        };
        activity.touch();
        activity
    }

    /// Marks the session as active now.
    pub fn touch(&self) {
        let ms = Instant::now().saturating_duration_since(self.epoch).as_millis() as u64;
        self.last_access_ms.store(ms, Ordering::Relaxed);
    }

    /// How long the session has been idle as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        let last = self.epoch + Duration::from_millis(self.last_access_ms.load(Ordering::Relaxed));
        now.saturating_duration_since(last)
    }
}

#[derive(Debug)]
struct SessionEntry {
    session_id: u64,
    created: Instant,
    activity: Arc<SessionActivity>,
    kill_tx: ShutdownSender,
}

/// Handed to a session when it is admitted into the registry.
#[derive(Debug)]
pub struct Registration {
    pub session_id: u64,
    pub activity: Arc<SessionActivity>,
    /// Fires when the session is force-closed (idle reaper).
    pub kill_rx: broadcast::Receiver<()>,
}

/// A point-in-time view of one registered session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub addr: SocketAddr,
    pub session_id: u64,
    pub age: Duration,
    pub idle: Duration,
}

#[derive(Debug)]
pub struct SessionRegistry {
    epoch: Instant,
    next_session_id: AtomicU64,
    sessions: Mutex<HashMap<SocketAddr, SessionEntry>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            next_session_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new session unless the registry already holds `max_sessions` entries or
    /// the address is already present. The size check and the insert happen under one lock.
    pub fn try_register(&self, addr: SocketAddr, max_sessions: usize) -> Option<Registration> {
        let mut sessions = self.sessions.lock();
        if sessions.len() >= max_sessions || sessions.contains_key(&addr) {
            return None;
        }

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let activity = Arc::new(SessionActivity::new(self.epoch));
        let (kill_tx, kill_rx) = broadcast::channel(1);
        sessions.insert(
            addr,
            SessionEntry {
                session_id,
                created: Instant::now(),
                activity: activity.clone(),
                kill_tx,
            },
        );
        metrics::CONNECTED_CLIENTS.set(sessions.len() as i64);

        Some(Registration {
            session_id,
            activity,
            kill_rx,
        })
    }

    /// Removes the entry for `addr` if it still belongs to `session_id`.
    /// Returns false when the reaper already removed it.
    pub fn remove(&self, addr: &SocketAddr, session_id: u64) -> bool {
        let mut sessions = self.sessions.lock();
        let owned = sessions
            .get(addr)
            .is_some_and(|entry| entry.session_id == session_id);
        if owned {
            sessions.remove(addr);
            metrics::CONNECTED_CLIENTS.set(sessions.len() as i64);
        }
        owned
    }

    /// Removes every session idle for longer than `idle_timeout` and signals each of them to
    /// close. Returns what was removed.
    pub fn reap_idle(&self, idle_timeout: Duration) -> Vec<SessionInfo> {
        let now = Instant::now();
        let mut reaped = Vec::new();
        let mut sessions = self.sessions.lock();
        sessions.retain(|addr, entry| {
            let idle = entry.activity.idle_for(now);
            if idle <= idle_timeout {
                return true;
            }
            // The session may already be on its way out; a closed channel is fine.
            let _ = entry.kill_tx.send(());
            reaped.push(SessionInfo {
                addr: *addr,
                session_id: entry.session_id,
                age: now.saturating_duration_since(entry.created),
                idle,
            });
            false
        });
        metrics::CONNECTED_CLIENTS.set(sessions.len() as i64);
        reaped
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.sessions.lock().contains_key(addr)
    }

    /// A snapshot for reporting. Entries may be gone by the time the caller looks at them.
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let now = Instant::now();
        self.sessions
            .lock()
            .iter()
            .map(|(addr, entry)| SessionInfo {
                addr: *addr,
                session_id: entry.session_id,
                age: now.saturating_duration_since(entry.created),
                idle: entry.activity.idle_for(now),
            })
            .collect()
    }
}
