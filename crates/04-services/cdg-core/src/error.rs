use std::path::PathBuf;
use thiserror::Error;

pub type CdgResult<T> = Result<T, CdgError>;

#[derive(Debug, Error)]
pub enum CdgError {
    #[error("failed to read CD+G stream {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
