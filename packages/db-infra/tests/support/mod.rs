//! Scriptable in-memory backend for exercising the connection manager.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use db_infra::{Backend, DbInfraError, DriverError};
use parking_lot::Mutex;

/// Quiet unless `TEST_LOG` is set.
pub fn init_logging() {
    telemetry::init_test_logger();
}

#[derive(Debug, Clone, Default)]
pub struct FakeConfig {
    pub host: String,
    pub port: u16,
    pub max_open: u32,
    /// Refuse every dial made with this config.
    pub refuse: bool,
}

impl FakeConfig {
    pub fn working() -> Self {
        Self {
            host: "db".into(),
            port: 5432,
            max_open: 5,
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::working()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeClient {
    pub id: usize,
    pub identity: String,
}

impl FakeClient {
    pub fn double(id: usize) -> Self {
        Self {
            id,
            identity: "test-double".into(),
        }
    }
}

/// Dial outcomes are taken from the script in order; an empty script dials
/// successfully.
#[derive(Default)]
pub struct FakeBackend {
    dial_delay: Duration,
    ping_delay: Duration,
    probe_ok: AtomicBool,
    script: Mutex<VecDeque<bool>>,
    dials: AtomicUsize,
    pings: AtomicUsize,
    closes: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            probe_ok: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }

    pub fn with_ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = delay;
        self
    }

    /// `true` entries succeed, `false` entries refuse the dial.
    pub fn with_script(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        *self.script.lock() = outcomes.into_iter().collect();
        self
    }

    pub fn failing_probe(self) -> Self {
        self.probe_ok.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_probe_ok(&self, ok: bool) {
        self.probe_ok.store(ok, Ordering::SeqCst);
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    type Config = FakeConfig;
    type Client = FakeClient;

    fn name(&self) -> &'static str {
        "fake"
    }

    async fn open(&self, config: &FakeConfig, identity: &str) -> Result<FakeClient, DbInfraError> {
        let id = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }

        let scripted_ok = self.script.lock().pop_front().unwrap_or(true);
        if config.refuse || !scripted_ok {
            return Err(DbInfraError::ConnectFailed {
                source: DriverError::msg(format!(
                    "dial {}:{} refused (attempt {id})",
                    config.host, config.port
                )),
            });
        }

        Ok(FakeClient {
            id,
            identity: identity.to_string(),
        })
    }

    async fn ping(&self, _client: &FakeClient) -> Result<(), DriverError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if !self.ping_delay.is_zero() {
            tokio::time::sleep(self.ping_delay).await;
        }
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DriverError::msg("server selection timeout"))
        }
    }

    async fn close(&self, _client: &FakeClient) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
