use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration du codec et de la politique de réception
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Ajouter le transaction-id à un content-location terminé par '='
    pub append_transaction_id: bool,
    /// Nombre de content-locations mémorisés pour la déduplication
    pub dedup_capacity: usize,
    /// Taille maximale d'une PDU acceptée par le décodeur
    pub max_pdu_size: usize,
}

impl CodecConfig {
    pub const DEFAULT_DEDUP_CAPACITY: usize = 256;
    pub const DEFAULT_MAX_PDU_SIZE: usize = 300 * 1024;

    pub fn new() -> Self {
        Self {
            append_transaction_id: false,
            dedup_capacity: Self::DEFAULT_DEDUP_CAPACITY,
            max_pdu_size: Self::DEFAULT_MAX_PDU_SIZE,
        }
    }

    pub fn with_append_transaction_id(mut self, append: bool) -> Self {
        self.append_transaction_id = append;
        self
    }

    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.dedup_capacity == 0 {
            return Err(Error::Config("dedup_capacity must be positive".to_string()));
        }
        if self.max_pdu_size == 0 {
            return Err(Error::Config("max_pdu_size must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new()
    }
}
