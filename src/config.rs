//! Database configuration
//!
//! Only codec buffer pooling is tunable; everything else in the engine is
//! fixed by the wire format.

use serde::{Deserialize, Serialize};

use crate::errors::{DbError, DbResult};

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Idle encode buffers kept for reuse (default: 8)
    #[serde(default = "default_encoder_pool_size")]
    pub encoder_pool_size: usize,

    /// Initial capacity of a fresh encode buffer in bytes (default: 256)
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Buffers that grew past this many bytes are not pooled (default: 64 KiB)
    #[serde(default = "default_max_pooled_buffer")]
    pub max_pooled_buffer: usize,
}

fn default_encoder_pool_size() -> usize {
    8
}

fn default_buffer_capacity() -> usize {
    256
}

fn default_max_pooled_buffer() -> usize {
    64 * 1024
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            encoder_pool_size: default_encoder_pool_size(),
            buffer_capacity: default_buffer_capacity(),
            max_pooled_buffer: default_max_pooled_buffer(),
        }
    }
}

impl DatabaseConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> DbResult<Self> {
        let config: DatabaseConfig = serde_json::from_str(json)
            .map_err(|e| DbError::config(format!("Invalid database config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Create config with pooling disabled
    pub fn unpooled() -> Self {
        Self {
            encoder_pool_size: 0,
            ..Self::default()
        }
    }

    fn validate(&self) -> DbResult<()> {
        if self.buffer_capacity > self.max_pooled_buffer {
            return Err(DbError::config(format!(
                "buffer_capacity ({}) exceeds max_pooled_buffer ({})",
                self.buffer_capacity, self.max_pooled_buffer
            )));
        }
        Ok(())
    }
}
