/// The closed set of error kinds an operation, the cleaver, the sampler, the mutator,
/// or the pipeline driver can surface.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no payload matched the selector: {0}")]
    NoMatch(String),

    #[error("images do not form the required grid: {0}")]
    InvalidGrid(String),

    #[error("geometry cannot be computed: {0}")]
    DegenerateInput(String),

    #[error("iterative method did not converge after {iterations} iterations (achieved {achieved})")]
    NonConvergent { iterations: usize, achieved: f64 },

    #[error("operation requires non-empty input: {0}")]
    EmptyCollection(String),

    #[error("duplicate parameter key: {0}")]
    DuplicateParameter(String),

    #[error("unknown parameter key: {0}")]
    UnknownParameter(String),

    #[error("unbalanced child scope: {0}")]
    InvalidScope(String),

    #[error("external collaborator failed: {0}")]
    IoError(String),

    #[error("unsupported text encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<dicomaton_world::GeomError> for CoreError {
    fn from(e: dicomaton_world::GeomError) -> Self {
        CoreError::DegenerateInput(e.to_string())
    }
}

impl From<dicomaton_threed::IndexError> for CoreError {
    fn from(e: dicomaton_threed::IndexError) -> Self {
        CoreError::InvalidGrid(e.to_string())
    }
}
