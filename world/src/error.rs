/// Errors raised by the geometry primitives.
///
/// These map onto the `degenerate-input` and `invalid-argument` error kinds from the
/// core error catalogue; callers that need the full `CoreError` taxonomy convert through
/// `dicomaton-core::error::CoreError::from`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    #[error("cannot normalize a zero-length vector")]
    ZeroLengthVector,
    #[error("input vectors are parallel; cannot span a plane")]
    ParallelVectors,
    #[error("at least 3 non-collinear points are required, got {0}")]
    TooFewPoints(usize),
    #[error("point set is collinear or degenerate; no unique best-fit plane exists")]
    CollinearPoints,
    #[error("transform matrix is not invertible")]
    NonInvertibleTransform,
    #[error("coordinate conversion produced invalid (negative) grid indices: ({0}, {1}, {2})")]
    NegativeIndices(f64, f64, f64),
}

pub type Result<T> = std::result::Result<T, GeomError>;
