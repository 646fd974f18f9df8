use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceRegistryError {
    #[error("device not found")]
    NotFound,

    #[error("device lookup failed: {0}")]
    Lookup(String),
}
