use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database '{0}' is missing")]
    MissingDatabase(&'static str),
}

impl From<LmdbError> for daiv_store::StoreError {
    fn from(e: LmdbError) -> Self {
        daiv_store::StoreError::Backend(e.to_string())
    }
}
