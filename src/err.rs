//! Error type shared by the source adapters, the reconciliation and the sinks.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Network problem or non-success HTTP status.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// The remote service answered but reported an error in its payload.
    #[error("service at {url} reported errors: {message}")]
    Service { url: String, message: String },
    /// The response body could not be interpreted.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("SGE table not found: {0:?}")]
    MissingTable(PathBuf),
    #[error("problem reading SGE table {path:?}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("could not persist variants to {path:?}: {message}")]
    Sink { path: PathBuf, message: String },
    #[error("invalid configuration in {path:?}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("invalid gene definition: {0}")]
    InvalidGene(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::Error;

    #[test]
    fn transport_error_message() {
        let err = Error::Transport {
            url: String::from("http://localhost"),
            message: String::from("connection refused"),
        };
        assert_eq!(
            "request to http://localhost failed: connection refused",
            err.to_string()
        );
    }

    #[test]
    fn missing_table_message() {
        let err = Error::MissingTable(PathBuf::from("data/rnu4-2_sge.txt"));
        assert_eq!(
            "SGE table not found: \"data/rnu4-2_sge.txt\"",
            err.to_string()
        );
    }
}
