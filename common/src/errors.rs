// Error handling framework

use thiserror::Error;

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate key violation: {0}")]
    DuplicateKey(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Errors raised while turning a law XML document into a parsed law
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Document contains no norm elements")]
    NoNorms,

    #[error("Missing required field '{field}' in norm {doknr}")]
    MissingField { doknr: String, field: String },

    #[error("Multiple values found for '{path}' in norm {doknr}")]
    MultipleValues { doknr: String, path: String },

    #[error("Unknown text format '{format}' in norm {doknr}")]
    UnknownTextFormat { doknr: String, format: String },

    #[error("Norm {0} has decorated text with unexpected content")]
    UnexpectedDecoratedContent(String),

    #[error("Norm {0} has both TOC and Content")]
    BothTocAndContent(String),

    #[error("Unknown norm structure encountered: {0}")]
    UnknownNormStructure(String),

    #[error("Law has no abbreviation")]
    NoAbbreviation,
}

/// Errors raised while talking to gesetze-im-internet.de
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Invalid table of contents: {0}")]
    InvalidToc(String),

    #[error("Invalid law archive: {0}")]
    InvalidArchive(String),

    #[error("Failed to parse downloaded law: {0}")]
    Parse(#[from] ParseError),
}

impl DownloadError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::RequestFailed { .. } => true,
            DownloadError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Law data location errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Filesystem error: {0}")]
    FileSystemError(String),

    #[error("Law not found in data location: {0}")]
    LawNotFound(String),

    #[error("Invalid law data for {slug}: {reason}")]
    InvalidLawData { slug: String, reason: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::FileSystemError(err.to_string())
    }
}

/// Errors raised by the sync pipeline
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Dubious number of laws to remove ({count}, limit {limit}) - aborting")]
    DubiousRemovalCount { count: usize, limit: usize },

    #[error("Failed to parse law {slug}: {source}")]
    Parse {
        slug: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Errors raised while writing export files
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Filesystem error: {0}")]
    FileSystemError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::FileSystemError(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::SerializationFailed(err.to_string())
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateKey(db_err.message().to_string()),
                        "23503" => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(err.to_string())
    }
}
