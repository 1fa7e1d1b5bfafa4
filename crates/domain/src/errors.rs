use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Name part too long: {0}")]
    NamePartTooLong(String),

    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Bad service type in name: {0}")]
    BadTypeInName(String),

    #[error("Service name is not unique: {0}")]
    NonUniqueName(String),

    #[error("Service not registered: {0}")]
    ServiceNotRegistered(String),

    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport is closed")]
    TransportClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}
