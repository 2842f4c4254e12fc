//! Connection manager for the database lifecycle.

use std::time::Duration;

use tracing::{debug, warn};

use crate::db::{DatabaseClient, MssqlClient};
use crate::error::{QueryCsvError, Result};

/// Deadline for opening the connection and answering the first ping.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the single database connection used for the whole run.
///
/// Acquire with [`ConnectionManager::open`] and release with
/// [`ConnectionManager::shutdown`] on every path once acquired.
pub struct ConnectionManager {
    db: Box<dyn DatabaseClient>,
}

impl ConnectionManager {
    /// Connects to SQL Server and verifies the server answers.
    pub async fn open(connection_string: &str) -> Result<Self> {
        let client = tokio::time::timeout(CONNECT_TIMEOUT, MssqlClient::connect(connection_string))
            .await
            .map_err(|_| {
                QueryCsvError::connectivity(format!(
                    "timed out after {} seconds while connecting",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })??;
        Self::with_client(Box::new(client)).await
    }

    /// Adopts an already opened client after checking connectivity.
    ///
    /// The client is closed again when the check fails.
    pub async fn with_client(mut db: Box<dyn DatabaseClient>) -> Result<Self> {
        let pinged = match tokio::time::timeout(CONNECT_TIMEOUT, db.ping()).await {
            Ok(result) => result,
            Err(_) => Err(QueryCsvError::connectivity(format!(
                "ping timed out after {} seconds",
                CONNECT_TIMEOUT.as_secs()
            ))),
        };

        if let Err(e) = pinged {
            if let Err(close_err) = db.close().await {
                warn!("Failed to close connection after ping failure: {}", close_err);
            }
            return Err(match e {
                e @ QueryCsvError::Connectivity(_) => e,
                other => QueryCsvError::connectivity(other.to_string()),
            });
        }

        debug!("Database connection verified");
        Ok(Self { db })
    }

    /// Get the database client.
    pub fn db(&mut self) -> &mut dyn DatabaseClient {
        self.db.as_mut()
    }

    /// Closes the connection, consuming the manager.
    pub async fn shutdown(mut self) -> Result<()> {
        self.db.close().await
    }
}

/// Replaces the session of `db` with a fresh, verified one.
///
/// Used after a batch timed out: the server only stops the abandoned request once its
/// session goes away. Any failure here is a connectivity error.
pub async fn reopen(db: &mut dyn DatabaseClient) -> Result<()> {
    let reopened = tokio::time::timeout(CONNECT_TIMEOUT, async {
        db.reconnect().await?;
        db.ping().await
    })
    .await
    .unwrap_or_else(|_| {
        Err(QueryCsvError::connectivity(format!(
            "timed out after {} seconds while reconnecting",
            CONNECT_TIMEOUT.as_secs()
        )))
    });

    match reopened {
        Ok(()) => {
            debug!("Database connection reopened");
            Ok(())
        }
        Err(e @ QueryCsvError::Connectivity(_)) => Err(e),
        Err(other) => Err(QueryCsvError::connectivity(other.to_string())),
    }
}
