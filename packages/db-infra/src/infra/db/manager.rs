//! Single-flight, resettable connection lifecycle.
//!
//! A [`ConnectionManager`] owns at most one live client for a [`Backend`].
//! The first `connect` of a generation runs the connect body (open, probe,
//! install); every concurrent caller waits on the same gate and then observes
//! the recorded outcome without dialing again. The outcome, success or
//! failure, stays cached until [`ConnectionManager::reset`] starts a new
//! generation.
//!
//! # Consistency contract
//!
//! Only the connect body is serialized. `client`, `ping`, `close` and
//! `set_client` read or write the client slot without waiting on the gate, so
//! while a `reset` is in flight they may observe either the previous handle or
//! the new one. `reset` never closes the handle it replaces; whoever still holds
//! the old handle owns its shutdown. Callers that need readers to be ordered
//! with respect to a reset must add their own synchronization around both.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DbInfraError, DriverError};

/// Identity tag used when the host name cannot be resolved.
pub const DEFAULT_IDENTITY: &str = "localhost";

/// Driver capabilities the manager needs from a database backend.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    type Config: Send + Sync;
    type Client: Clone + Send + Sync + 'static;

    /// Short backend label for log fields.
    fn name(&self) -> &'static str;

    /// Build and validate driver options from `config`, then dial.
    ///
    /// Option validation failures must surface as
    /// [`DbInfraError::ConfigInvalid`] and dial failures as
    /// [`DbInfraError::ConnectFailed`].
    async fn open(
        &self,
        config: &Self::Config,
        identity: &str,
    ) -> Result<Self::Client, DbInfraError>;

    async fn ping(&self, client: &Self::Client) -> Result<(), DriverError>;

    async fn close(&self, client: &Self::Client) -> Result<(), DriverError>;
}

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Treat a cached connect failure as unfired on the next `connect`.
    /// Off by default: failures are sticky until `reset`.
    pub retry_failed_connect: bool,
    /// Deadline for `ping`.
    pub probe_timeout: Duration,
    /// Deadline for the connect attempt made by `reset`.
    pub reset_timeout: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            retry_failed_connect: false,
            probe_timeout: Duration::from_secs(5),
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unfired,
    Fired { ok: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    pub state: GateState,
    pub generation: u64,
    pub connect_attempts: u64,
}

#[derive(Clone, Copy)]
struct Published {
    state: GateState,
    generation: u64,
}

enum Gate {
    Unfired,
    Fired(Result<(), DbInfraError>),
}

struct Barrier {
    gate: Gate,
    generation: u64,
}

pub struct ConnectionManager<B: Backend> {
    backend: B,
    options: ManagerOptions,
    barrier: Mutex<Barrier>,
    client: RwLock<Option<B::Client>>,
    // Gate state and generation are published together so a snapshot never
    // pairs one generation's outcome with another's number.
    published: RwLock<Published>,
    connect_attempts: AtomicU64,
}

impl<B: Backend> ConnectionManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, ManagerOptions::default())
    }

    pub fn with_options(backend: B, options: ManagerOptions) -> Self {
        Self {
            backend,
            options,
            barrier: Mutex::new(Barrier {
                gate: Gate::Unfired,
                generation: 0,
            }),
            client: RwLock::new(None),
            published: RwLock::new(Published {
                state: GateState::Unfired,
                generation: 0,
            }),
            connect_attempts: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Connect once per generation, bounded by `cancel`.
    ///
    /// Cancellation observed by the caller that runs the connect body is
    /// recorded as the generation's outcome like any other failure.
    pub async fn connect(
        &self,
        config: &B::Config,
        cancel: &CancellationToken,
    ) -> Result<(), DbInfraError> {
        self.connect_inner(config, Some(cancel), None).await
    }

    /// Connect once per generation, bounded by a deadline.
    pub async fn connect_with_timeout(
        &self,
        config: &B::Config,
        timeout: Duration,
    ) -> Result<(), DbInfraError> {
        self.connect_inner(config, None, Some(timeout)).await
    }

    /// Whatever client is currently installed. Never connects.
    pub fn client(&self) -> Option<B::Client> {
        self.client.read().clone()
    }

    /// Replace the installed client without touching the gate.
    pub fn set_client(&self, client: B::Client) {
        debug!(
            set_client = "override",
            backend = self.backend.name(),
            generation = self.published.read().generation
        );
        *self.client.write() = Some(client);
    }

    pub async fn ping(&self) -> Result<(), DbInfraError> {
        let client = self.client().ok_or(DbInfraError::NotConnected)?;
        let limit = self.options.probe_timeout;

        match tokio::time::timeout(limit, self.backend.ping(&client)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(DbInfraError::PingFailed { source }),
            Err(_) => Err(DbInfraError::PingFailed {
                source: DriverError::msg(format!("ping timed out after {}ms", limit.as_millis())),
            }),
        }
    }

    /// Shut down the installed client.
    ///
    /// The gate stays fired and the slot keeps the closed handle, so a later
    /// `connect` returns the cached outcome instead of reconnecting. Use
    /// `reset` to dial again.
    pub async fn close(&self) -> Result<(), DbInfraError> {
        let client = self.client().ok_or(DbInfraError::NotConnected)?;
        self.backend
            .close(&client)
            .await
            .map_err(|source| DbInfraError::CloseFailed { source })?;
        info!(close = "done", backend = self.backend.name());
        Ok(())
    }

    /// Start a new generation and connect again before returning.
    ///
    /// The previous client is not closed.
    pub async fn reset(&self, config: &B::Config) -> Result<(), DbInfraError> {
        let mut barrier = self.barrier.lock().await;
        barrier.gate = Gate::Unfired;
        barrier.generation += 1;
        self.publish(&barrier);

        info!(
            reset = "start",
            backend = self.backend.name(),
            generation = barrier.generation
        );

        let outcome = self
            .run_attempt(
                config,
                None,
                Some(self.options.reset_timeout),
                barrier.generation,
            )
            .await;
        barrier.gate = Gate::Fired(outcome.clone());
        self.publish(&barrier);
        outcome
    }

    pub fn state(&self) -> GateState {
        self.published.read().state
    }

    pub fn stats(&self) -> ManagerStats {
        let published = *self.published.read();
        ManagerStats {
            state: published.state,
            generation: published.generation,
            connect_attempts: self.connect_attempts.load(Ordering::Acquire),
        }
    }

    async fn connect_inner(
        &self,
        config: &B::Config,
        cancel: Option<&CancellationToken>,
        timeout: Option<Duration>,
    ) -> Result<(), DbInfraError> {
        let wait_start = Instant::now();
        // Held for the whole connect body: concurrent callers queue here.
        let mut barrier = self.barrier.lock().await;
        let waited_ms = wait_start.elapsed().as_millis();

        if let Gate::Fired(outcome) = &barrier.gate {
            if outcome.is_ok() || !self.options.retry_failed_connect {
                debug!(
                    connect = "cached",
                    backend = self.backend.name(),
                    generation = barrier.generation,
                    ok = outcome.is_ok(),
                    waited_ms = waited_ms
                );
                return outcome.clone();
            }

            barrier.generation += 1;
            info!(
                connect = "retry_after_failure",
                backend = self.backend.name(),
                generation = barrier.generation
            );
        }

        let outcome = self
            .run_attempt(config, cancel, timeout, barrier.generation)
            .await;
        barrier.gate = Gate::Fired(outcome.clone());
        self.publish(&barrier);
        outcome
    }

    async fn run_attempt(
        &self,
        config: &B::Config,
        cancel: Option<&CancellationToken>,
        timeout: Option<Duration>,
        generation: u64,
    ) -> Result<(), DbInfraError> {
        self.connect_attempts.fetch_add(1, Ordering::AcqRel);
        let start = Instant::now();
        let identity = resolve_identity();

        info!(
            connect = "start",
            backend = self.backend.name(),
            generation = generation,
            identity = %identity
        );

        let outcome = tokio::select! {
            biased;

            _ = wait_cancelled(cancel) => Err(DbInfraError::ConnectFailed {
                source: DriverError::msg("connect cancelled"),
            }),
            res = bounded(self.establish(config, &identity), timeout) => res,
        };

        match &outcome {
            Ok(()) => info!(
                connect = "ok",
                backend = self.backend.name(),
                generation = generation,
                elapsed_ms = start.elapsed().as_millis()
            ),
            Err(e) => warn!(
                connect = "failed",
                backend = self.backend.name(),
                generation = generation,
                elapsed_ms = start.elapsed().as_millis(),
                error = %e
            ),
        }

        outcome
    }

    async fn establish(&self, config: &B::Config, identity: &str) -> Result<(), DbInfraError> {
        let client = self.backend.open(config, identity).await?;

        if let Err(source) = self.backend.ping(&client).await {
            if let Err(close_err) = self.backend.close(&client).await {
                debug!(
                    backend = self.backend.name(),
                    error = %close_err,
                    "closing unprobed client returned error"
                );
            }
            return Err(DbInfraError::probe_failed(source));
        }

        // No await between the probe and the install, so a cancelled attempt
        // never leaves a half-installed client behind.
        *self.client.write() = Some(client);
        Ok(())
    }

    fn publish(&self, barrier: &Barrier) {
        let state = match &barrier.gate {
            Gate::Unfired => GateState::Unfired,
            Gate::Fired(outcome) => GateState::Fired {
                ok: outcome.is_ok(),
            },
        };
        *self.published.write() = Published {
            state,
            generation: barrier.generation,
        };
    }
}

/// Host name used to tag driver sessions, or [`DEFAULT_IDENTITY`].
pub fn resolve_identity() -> String {
    identity_or_default(&gethostname::gethostname().to_string_lossy())
}

fn identity_or_default(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        DEFAULT_IDENTITY.to_string()
    } else {
        host.to_string()
    }
}

async fn wait_cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

async fn bounded<F>(fut: F, timeout: Option<Duration>) -> Result<(), DbInfraError>
where
    F: Future<Output = Result<(), DbInfraError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
            Err(DbInfraError::ConnectFailed {
                source: DriverError::msg(format!(
                    "connect deadline of {}ms exceeded",
                    limit.as_millis()
                )),
            })
        }),
        None => fut.await,
    }
}
