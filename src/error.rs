use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::KeyPath;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode catalog as JSON")]
    Encode(#[source] serde_json::Error),

    #[error("invalid catalog format: {0}")]
    Format(String),

    #[error("type mismatch at {keypath}: {reason}")]
    TypeMismatch {
        keypath: KeyPath,
        reason: &'static str,
    },

    #[error("failed to read catalog {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write catalog {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to render system prompt")]
    Prompt(#[from] tera::Error),

    #[error("failed to translate a batch of {keys} keys after {attempts} attempts")]
    Exhausted { attempts: usize, keys: usize },
}
