use crate::shared::xml::XmlError;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed command xml: {0}")]
    Malformed(#[source] XmlError),
    #[error("unrecognized XML format; should contain node Path_Local_Root or node local")]
    UnrecognizedFormat,
    #[error("exception while parsing broadcast string: {0}")]
    Broadcast(#[source] XmlError),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite open failed at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create database parent {path}: {source}")]
    CreateParent {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite statement failed in {procedure}: {source}")]
    Sql {
        procedure: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("task store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn sql(procedure: &str, source: rusqlite::Error) -> Self {
        Self::Sql {
            procedure: procedure.to_string(),
            source,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.to_string().contains("permission was denied")
    }
}
