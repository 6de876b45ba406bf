use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Unsupported message type: {0:#04x}")]
    UnsupportedType(u8),

    #[error("Malformed field {field}: {reason}")]
    MalformedField { field: String, reason: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("PCAP parsing error: {0}")]
    PcapParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Vrai pour les erreurs dues à l'entrée elle-même (à ignorer, pas à réessayer)
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::UnsupportedType(_)
                | Error::MalformedField { .. }
                | Error::InvalidHeader(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
