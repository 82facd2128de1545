/// Error taxonomy.
///
/// Only catalog problems are errors. A click that resolves to nothing is a
/// `GuessOutcome::Ignored`, and losing lives is ordinary game state.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Debug, Error)]
pub enum GameError {
    /// Catalog is empty or has no usable record. Fatal: no round can start.
    #[error("Country data error: {0}")]
    Data(String),

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_message() {
        let e = GameError::Data("catalog has no named countries".into());
        assert_eq!(e.to_string(), "Country data error: catalog has no named countries");
    }
}
