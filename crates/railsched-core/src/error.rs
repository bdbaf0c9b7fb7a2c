use crate::ident::Identifier;
use crate::registry::Catalog;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("duplicate registration of '{id}' in the {catalog} catalog")]
    DuplicateRegistration { catalog: Catalog, id: Identifier },

    #[error("no '{id}' registered in the {catalog} catalog")]
    UnknownIdentifier { catalog: Catalog, id: Identifier },

    #[error("variant type is not registered in any catalog: {0}")]
    UnregisteredVariant(String),

    #[error("malformed tag: {0}")]
    MalformedTag(String),

    #[error("invalid identifier '{0}': expected 'namespace:path'")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
