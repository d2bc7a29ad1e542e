//! Document-store backend: MongoDB.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential};
use mongodb::Client;
use thiserror::Error;
use tracing::debug;

use super::manager::{Backend, ConnectionManager};
use crate::config::db::MongoConfig;
use crate::error::{DbInfraError, DriverError};

pub type MongoManager = ConnectionManager<MongoBackend>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MongoOptionsError {
    #[error("uri must not be empty")]
    MissingUri,
    #[error("min_pool_size ({min}) exceeds max_pool_size ({max})")]
    PoolBounds { min: u32, max: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct MongoBackend;

impl MongoBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for MongoBackend {
    type Config = MongoConfig;
    type Client = Client;

    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn open(&self, config: &MongoConfig, identity: &str) -> Result<Client, DbInfraError> {
        let opts = build_client_options(config, identity).await?;

        debug!(
            pool = "about_to_build",
            max_pool_size = config.max_pool_size,
            min_pool_size = config.min_pool_size,
            app_name = %identity
        );

        // Construction validates the options; no network traffic happens
        // until the first operation, which is the liveness probe.
        Client::with_options(opts).map_err(DbInfraError::config_invalid)
    }

    async fn ping(&self, client: &Client) -> Result<(), DriverError> {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(DriverError::new)
    }

    async fn close(&self, client: &Client) -> Result<(), DriverError> {
        client.clone().shutdown().await;
        Ok(())
    }
}

/// Parse `config.uri` and layer identity, pool bounds and credentials on top.
pub async fn build_client_options(
    config: &MongoConfig,
    identity: &str,
) -> Result<ClientOptions, DbInfraError> {
    validate(config).map_err(DbInfraError::config_invalid)?;

    let mut opts = ClientOptions::parse(config.uri.trim())
        .await
        .map_err(DbInfraError::config_invalid)?;

    opts.app_name = Some(identity.to_string());
    if config.max_pool_size > 0 {
        opts.max_pool_size = Some(config.max_pool_size);
    }
    if config.min_pool_size > 0 {
        opts.min_pool_size = Some(config.min_pool_size);
    }
    if !config.username.is_empty() {
        opts.credential = Some(
            Credential::builder()
                .username(config.username.clone())
                .password(config.password.clone())
                .build(),
        );
    }

    Ok(opts)
}

fn validate(config: &MongoConfig) -> Result<(), MongoOptionsError> {
    if config.uri.trim().is_empty() {
        return Err(MongoOptionsError::MissingUri);
    }
    if config.max_pool_size > 0 && config.min_pool_size > config.max_pool_size {
        return Err(MongoOptionsError::PoolBounds {
            min: config.min_pool_size,
            max: config.max_pool_size,
        });
    }
    Ok(())
}
