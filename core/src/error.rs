use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("Synchronization symbol not found")]
    SyncNotFound,

    #[error("Sample source exhausted")]
    SourceExhausted,

    #[error("Ordered statistics decoding did not find a unique header")]
    OsdNotUnique,

    #[error("CRC mismatch in header")]
    HeaderCrcMismatch,

    #[error("Invalid call sign: {0}")]
    InvalidCallSign(u64),

    #[error("Unsupported operating mode: {0}")]
    UnsupportedMode(u8),

    #[error("CRC mismatch in payload")]
    PayloadCrcMismatch,

    #[error("Packet too large: {len} bytes, mode allows {max}")]
    PacketTooLarge { len: usize, max: usize },

    #[error("Operating mode carries no payload")]
    NoPayload,

    #[error("Encoder not configured")]
    NotConfigured,

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ModemError>;
