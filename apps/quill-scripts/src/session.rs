//! Scoped store sessions for the scripts.
//!
//! [`run`] owns the whole life of a script: it loads configuration,
//! installs tracing, opens the store, runs the script body and then
//! closes the connection pool whether the body succeeded or not.

use std::process::ExitCode;

use futures::future::BoxFuture;

use quill_core::ports::{PasswordService, Store};
use quill_infra::{Argon2PasswordService, DatabaseConnections, InMemoryStore, PostgresStore};

use crate::config::AppConfig;
use crate::fixtures;
use crate::telemetry::{TelemetryConfig, init_telemetry};

/// An open store plus the pool backing it, if any.
pub struct Session {
    store: Box<dyn Store>,
    connections: Option<DatabaseConnections>,
    passwords: Argon2PasswordService,
}

impl Session {
    /// Connects to PostgreSQL when configured, otherwise starts empty in memory.
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let passwords = Argon2PasswordService::new();
        match &config.database {
            Some(database) => {
                let connections = DatabaseConnections::init(database).await?;
                let store = PostgresStore::new(connections.main.clone());
                Ok(Self {
                    store: Box::new(store),
                    connections: Some(connections),
                    passwords,
                })
            }
            None => {
                tracing::warn!("DATABASE_URL not set. Using the in-memory store.");
                Ok(Self {
                    store: Box::new(InMemoryStore::new()),
                    connections: None,
                    passwords,
                })
            }
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn passwords(&self) -> &dyn PasswordService {
        &self.passwords
    }

    pub fn is_in_memory(&self) -> bool {
        self.connections.is_none()
    }

    /// Loads the sample data when the store starts empty on every run.
    pub async fn seed_if_in_memory(&self) -> anyhow::Result<()> {
        if self.is_in_memory() {
            let summary = fixtures::seed(self.store(), self.passwords()).await?;
            tracing::debug!(?summary, "Seeded in-memory store");
        }
        Ok(())
    }

    /// Releases the connection pool, if one was opened.
    pub async fn close(self) {
        if let Some(connections) = self.connections {
            if let Err(e) = connections.close().await {
                tracing::warn!(error = %e, "Failed to close database connection");
            }
        }
    }
}

/// Runs `body` against a fresh session and maps the outcome to an exit code.
pub async fn run<F>(script: &'static str, body: F) -> ExitCode
where
    F: for<'a> FnOnce(&'a Session) -> BoxFuture<'a, anyhow::Result<()>>,
{
    dotenvy::dotenv().ok();
    init_telemetry(&TelemetryConfig::from_env(), script);

    let config = AppConfig::from_env();
    let session = match Session::open(&config).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(script, error = %e, "Failed to open session");
            return ExitCode::FAILURE;
        }
    };

    let result = body(&session).await;
    session.close().await;

    match result {
        Ok(()) => {
            tracing::info!(script, "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(script, error = ?e, "Script failed");
            ExitCode::FAILURE
        }
    }
}
