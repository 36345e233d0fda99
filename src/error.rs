use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcurementError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Data source error: {0}")]
    DataSourceError(String),

    #[error("Contracting body '{0}' is not in the catalog")]
    UnknownContractingBody(String),

    #[error("Invalid CPV code '{0}': expected an 8-digit numeric body")]
    InvalidCpvCode(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProcurementError {
    /// True for failures raised while validating inputs, before any read was issued.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError(_) | Self::UnknownContractingBody(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProcurementError>;
