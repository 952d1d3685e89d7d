use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown identity: {0}")]
    UnknownIdentity(u32),
}
