use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickstash_core::ValidationError),

    #[error(transparent)]
    Store(#[from] tickstash_warehouse::StoreError),

    #[error(transparent)]
    Tool(#[from] tickstash_core::ToolError),

    #[error(transparent)]
    Fetch(#[from] tickstash_core::FetchError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Store(_) => 2,
            Self::Tool(_) => 2,
            Self::Fetch(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
