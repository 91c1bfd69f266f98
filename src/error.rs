use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenesisError>;

/// Every failure the client can surface to its caller.
///
/// Service warnings are not errors: they are logged and the call continues.
#[derive(Debug, Error)]
pub enum GenesisError {
    /// The service answered with a non-2xx HTTP status.
    #[error("{message}")]
    Transport {
        status: u16,
        url: String,
        message: String,
    },

    #[error("could not connect to {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Status code -1.
    #[error("GENESIS reported a system error: {0}")]
    ServiceSystem(String),

    /// No matching object, or an error-typed status. The query parameters are at fault.
    #[error("{0}")]
    ServiceQuery(String),

    #[error("job protocol violation: {0}")]
    Protocol(String),

    #[error("job {job_id} did not finish within {waited:?}")]
    JobTimeout { job_id: String, waited: Duration },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Rename(#[from] RenameError),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("failed to parse API JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed CSV table: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("cube file contains no header line")]
    NoHeader,

    #[error("malformed header on line {line}: missing block type")]
    MissingBlockType { line: usize },

    #[error("line {line} of block {block} has {found} field(s), header declares {expected}")]
    RowWidth {
        block: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error(
        "observations header has {found} column(s), cannot repeat the four value columns for {variables} variables"
    )]
    ValueColumns { variables: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("cube has no {0} block")]
    MissingBlock(String),

    #[error("block {block} has no column {column}")]
    MissingColumn { block: String, column: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    #[error("value {value:?} in row {row} of column {column} is not a valid {expected}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("no value column found for variable {0}")]
    MissingColumn(String),
}

/// Builds the error for a non-2xx response, with remediation for the common auth failures.
pub(crate) fn format_http_error(status: u16, url: &str, body: &str) -> GenesisError {
    let body = body.trim();

    let message = match status {
        401 | 403 => format!(
            "GENESIS authentication/authorization failed (HTTP {}).\n- Check username and password in .genesisrc or GENESIS_USERNAME / GENESIS_PASSWORD\n- Some tables require a registered account\n\nServer message: {}\nrequest: {}",
            status,
            if body.is_empty() { "(none)" } else { body },
            url
        ),
        404 => format!(
            "GENESIS endpoint not found (HTTP 404).\n- Your configured base URL may be wrong\n- Recommended url: {}\n\nrequest: {}",
            crate::config::DEFAULT_URL,
            url
        ),
        _ => format!("API request failed: HTTP {} for url ({})\n{}", status, url, body),
    };

    GenesisError::Transport {
        status,
        url: url.to_string(),
        message,
    }
}
