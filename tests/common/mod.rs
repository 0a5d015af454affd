//! Common test utilities: a scripted gateway, an in-memory backup store,
//! and session factories.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use sessionkeeper::{AuthGateway, BackupStore, GatewayError, Session, TokenPair};

/// Install a test subscriber once per binary; repeat calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn session(identity: &str, access: &str, refresh: &str, expires_in_secs: i64) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
        identity: identity.to_string(),
    }
}

pub fn pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

/// Scripted gateway reply. Cloneable so a script can repeat its default.
#[derive(Debug, Clone)]
pub enum Reply {
    Session(Session),
    Absent,
    /// The backend answered and rejected the credential (terminal for it).
    Rejected,
    /// The backend was unreachable (retryable).
    Unreachable,
}

struct Script {
    queue: VecDeque<Reply>,
    default: Reply,
}

impl Script {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            default: Reply::Absent,
        }
    }

    fn next(&mut self) -> Reply {
        self.queue.pop_front().unwrap_or_else(|| self.default.clone())
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Get,
    Refresh,
    Set,
}

/// Scripted in-memory auth gateway.
///
/// Each operation pops the next queued reply (falling back to a per-op
/// default), optionally after a configurable delay so tests can observe
/// in-flight behavior. Call counts and the concurrency high-water mark are
/// recorded for assertions.
pub struct MockGateway {
    get: Mutex<Script>,
    refresh: Mutex<Script>,
    set: Mutex<Script>,
    delay: Mutex<Duration>,
    get_calls: AtomicU32,
    refresh_calls: AtomicU32,
    set_calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            get: Mutex::new(Script::new()),
            refresh: Mutex::new(Script::new()),
            set: Mutex::new(Script::new()),
            delay: Mutex::new(Duration::ZERO),
            get_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            set_calls: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub fn queue_get(&self, reply: Reply) {
        self.get.lock().unwrap().queue.push_back(reply);
    }

    pub fn queue_refresh(&self, reply: Reply) {
        self.refresh.lock().unwrap().queue.push_back(reply);
    }

    pub fn queue_set(&self, reply: Reply) {
        self.set.lock().unwrap().queue.push_back(reply);
    }

    pub fn default_get(&self, reply: Reply) {
        self.get.lock().unwrap().default = reply;
    }

    pub fn default_refresh(&self, reply: Reply) {
        self.refresh.lock().unwrap().default = reply;
    }

    pub fn default_set(&self, reply: Reply) {
        self.set.lock().unwrap().default = reply;
    }

    /// Make every operation take this long (virtual time).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> u32 {
        self.set_calls.load(Ordering::SeqCst)
    }

    /// Highest number of operations ever observed in flight at once.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(&self, op: Op) -> Result<Option<Session>, GatewayError> {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = match op {
            Op::Get => {
                self.get_calls.fetch_add(1, Ordering::SeqCst);
                self.get.lock().unwrap().next()
            }
            Op::Refresh => {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                self.refresh.lock().unwrap().next()
            }
            Op::Set => {
                self.set_calls.fetch_add(1, Ordering::SeqCst);
                self.set.lock().unwrap().next()
            }
        };

        match (op, reply) {
            (_, Reply::Session(session)) => Ok(Some(session)),
            (_, Reply::Absent) => Ok(None),
            (_, Reply::Unreachable) => Err(GatewayError::Server("backend unreachable".to_string())),
            // A rejected lookup is indistinguishable from "no session".
            (Op::Get, Reply::Rejected) => Ok(None),
            (Op::Refresh, Reply::Rejected) => Err(GatewayError::InvalidRefreshToken),
            (Op::Set, Reply::Rejected) => Err(GatewayError::InvalidCredential),
        }
    }
}

impl AuthGateway for MockGateway {
    async fn get_session(&self) -> Result<Option<Session>, GatewayError> {
        self.call(Op::Get).await
    }

    async fn refresh_session(&self) -> Result<Option<Session>, GatewayError> {
        self.call(Op::Refresh).await
    }

    async fn set_session(&self, _pair: &TokenPair) -> Result<Option<Session>, GatewayError> {
        self.call(Op::Set).await
    }
}

/// In-memory backup store with operation counters.
pub struct MemoryBackup {
    record: Mutex<Option<TokenPair>>,
    saves: AtomicU32,
    clears: AtomicU32,
}

impl MemoryBackup {
    pub fn new() -> Self {
        Self {
            record: Mutex::new(None),
            saves: AtomicU32::new(0),
            clears: AtomicU32::new(0),
        }
    }

    pub fn with_record(pair: TokenPair) -> Self {
        let store = Self::new();
        *store.record.lock().unwrap() = Some(pair);
        store
    }

    pub fn record(&self) -> Option<TokenPair> {
        self.record.lock().unwrap().clone()
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> u32 {
        self.clears.load(Ordering::SeqCst)
    }
}

impl BackupStore for MemoryBackup {
    fn save(&self, pair: &TokenPair) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.record.lock().unwrap() = Some(pair.clone());
    }

    fn load(&self) -> Option<TokenPair> {
        self.record()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.record.lock().unwrap() = None;
    }
}
