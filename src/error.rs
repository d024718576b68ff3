#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dump JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid dump: {entity}.{field}: {message}")]
    InvalidDump {
        entity: String,
        field: &'static str,
        message: String,
    },
    #[error("theme error: {0}")]
    Theme(String),
    #[error("XML parse error: {0}")]
    Xml(String),
}

impl Error {
    pub(crate) fn invalid(
        entity: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidDump {
            entity: entity.into(),
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
