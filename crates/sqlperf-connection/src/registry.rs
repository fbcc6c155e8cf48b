//! Per-process registry of open connections

use parking_lot::RwLock;
use sqlperf_core::{Connection, ConnectionParams, DatabaseDriver, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::ConnKey;

/// Caches one open connection per `ConnKey`.
///
/// Connections are opened lazily on first request and reused afterwards.
/// A handle that reports itself closed is replaced on the next request, and
/// callers evict a handle with [`ConnectionRegistry::invalidate`] after a
/// connection-class failure so the following request reconnects.
pub struct ConnectionRegistry {
    /// Driver used to open new connections
    driver: Arc<dyn DatabaseDriver>,

    /// Open connections
    active: RwLock<HashMap<ConnKey, Arc<dyn Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry opening connections through `driver`
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Get the driver
    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// Return the cached connection for `params`, opening one if needed.
    ///
    /// Open failures are returned to the caller and nothing is cached.
    #[tracing::instrument(skip(self, params), fields(key = %ConnKey::from_params(params)))]
    pub async fn get_or_connect(&self, params: &ConnectionParams) -> Result<Arc<dyn Connection>> {
        let key = ConnKey::from_params(params);

        if let Some(conn) = self.get(&key) {
            if !conn.is_closed() {
                return Ok(conn);
            }
            tracing::debug!("cached connection is closed, reconnecting");
            self.active.write().remove(&key);
        }

        tracing::info!(
            connection_string = %redact_password(&self.driver.build_connection_string(params)),
            "opening connection"
        );
        let conn = self.driver.connect(params).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect");
            e
        })?;

        // Another request may have connected while this one was awaiting
        let (conn, surplus) = {
            let mut active = self.active.write();
            match active.get(&key) {
                Some(existing) if !existing.is_closed() => (existing.clone(), Some(conn)),
                _ => {
                    active.insert(key, conn.clone());
                    (conn, None)
                }
            }
        };

        match surplus {
            Some(surplus) => {
                tracing::debug!("connection already established concurrently, closing the new one");
                if let Err(e) = surplus.close().await {
                    tracing::debug!(error = %e, "error closing surplus connection");
                }
            }
            None => tracing::info!("connection established"),
        }
        Ok(conn)
    }

    /// Get a cached connection without opening one
    pub fn get(&self, key: &ConnKey) -> Option<Arc<dyn Connection>> {
        self.active.read().get(key).cloned()
    }

    /// Check if a connection is cached for `key`
    pub fn contains(&self, key: &ConnKey) -> bool {
        self.active.read().contains_key(key)
    }

    /// Close and evict the connection cached for `key`.
    ///
    /// Returns whether an entry was removed.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn invalidate(&self, key: &ConnKey) -> bool {
        let conn = self.active.write().remove(key);
        match conn {
            Some(conn) => {
                tracing::warn!("invalidating cached connection");
                if let Err(e) = conn.close().await {
                    tracing::debug!(error = %e, "error closing invalidated connection");
                }
                true
            }
            None => false,
        }
    }

    /// Close every cached connection
    pub async fn close_all(&self) {
        let conns: Vec<_> = self.active.write().drain().collect();
        for (key, conn) in conns {
            if let Err(e) = conn.close().await {
                tracing::debug!(key = %key, error = %e, "error closing connection");
            }
        }
    }

    /// Number of cached connections
    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }
}

/// Mask the value of any `Password=` pair in an ADO connection string
pub(crate) fn redact_password(conn_str: &str) -> String {
    conn_str
        .split(';')
        .map(|pair| match pair.split_once('=') {
            Some((k, _)) if k.trim().eq_ignore_ascii_case("password") => format!("{k}=********"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

