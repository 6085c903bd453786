use cdg_core::CdgError;
use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Load(#[from] CdgError),
    #[error("frame sink disconnected")]
    Disconnected,
}
