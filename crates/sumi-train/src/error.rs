use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Numeric(#[from] sumi_la::Error),

    #[error("gradient `{0}` has no matching parameter")]
    UnknownGradient(String),

    #[error("parameter `{0}` has no gradient")]
    MissingGradient(String),

    #[error("`{name}`: parameter has rank {param} but gradient has rank {grad}")]
    RankMismatch {
        name: String,
        param: usize,
        grad: usize,
    },

    #[error("{0}: backward called before forward")]
    BackwardBeforeForward(&'static str),

    #[error("dataset is empty")]
    EmptyDataset,
}

pub type Result<T> = core::result::Result<T, Error>;
