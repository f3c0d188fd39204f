use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, MetaballsError>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum MetaballsError {
    /// Grid step must be strictly positive.
    NonPositiveStep,
    /// Bounding-box margin must be non-negative.
    NegativeMargin,
    /// Finite-difference offset for normals must be strictly positive.
    NonPositiveNormalDelta,
}

impl std::error::Error for MetaballsError {}
