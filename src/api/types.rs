//! Shared API types.
//!
//! `ApiContext` is the axum state shared by every handler: the open database
//! connection behind a mutex. `rusqlite::Connection` is not `Sync`, so each
//! handler takes the lock for the duration of its synchronous database work
//! and releases it before the response is written. No lock is ever held
//! across an await point.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::models::enums::CareSetting;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct ApiContext {
    db: Arc<Mutex<Connection>>,
}

impl ApiContext {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Lock the database for a handler's unit of work.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }
}

/// Care-setting selector for prescription and investigation routes. The same
/// lifecycle serves both settings; the query parameter picks which table
/// family the operation touches.
#[derive(Debug, Deserialize)]
pub struct SettingQuery {
    pub setting: CareSetting,
}
