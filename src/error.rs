//! Error types.
//!
//! Two layers:
//!
//! - [`QuoteError`] is the typed taxonomy of the estimation engine. Library
//!   callers can match on it (tests assert on exact variants).
//! - [`AppError`] is the binary-level error: a message plus a process exit
//!   code. Engine errors convert into it at the app boundary.
//!
//! Exit code conventions:
//! - `2`: invalid input or configuration
//! - `3`: dataset/training problems
//! - `4`: runtime failures

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Engine-level errors.
///
/// Note on zip codes: an unresolved zip is *not* an error anywhere in the
/// engine. The location adjuster degrades to a named sentinel (Suburban,
/// multiplier 1.0) so a quote is always computable; see `location`.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// The requested service does not exist in the catalog.
    UnknownService { service: String },
    /// The size category is not valid for the requested service.
    UnknownSizeCategory { service: String, size: String },
    /// A fitted-model operation was requested but no model has been trained.
    ///
    /// End users never see this from `get_quote`: the rule-based variant is
    /// always available as a fallback. It surfaces only through explicit
    /// fitted-model APIs such as model export.
    ModelNotTrained,
    /// The training dataset contains no rows.
    EmptyDataset,
    /// The designated target column is absent from the dataset.
    MissingTargetColumn { column: String },
    /// A dataset row is unusable (non-numeric or non-positive price,
    /// negative size, non-finite feature). `row` is 1-based.
    InvalidRow { row: usize, message: String },
    /// The regression solver could not produce a finite fit.
    FitFailed(String),
    /// A catalog entry is internally inconsistent (e.g. a size category
    /// without a base cost).
    InvalidCatalog(String),
}

impl std::fmt::Display for QuoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteError::UnknownService { service } => {
                write!(f, "Unknown service '{service}' (not in the catalog).")
            }
            QuoteError::UnknownSizeCategory { service, size } => {
                write!(f, "Unknown size category '{size}' for service '{service}'.")
            }
            QuoteError::ModelNotTrained => {
                write!(f, "No fitted model is active; train one first.")
            }
            QuoteError::EmptyDataset => write!(f, "Training dataset is empty."),
            QuoteError::MissingTargetColumn { column } => {
                write!(f, "Target column '{column}' not found in the dataset.")
            }
            QuoteError::InvalidRow { row, message } => {
                write!(f, "Invalid dataset row {row}: {message}")
            }
            QuoteError::FitFailed(message) => write!(f, "Model fit failed: {message}"),
            QuoteError::InvalidCatalog(message) => write!(f, "Invalid catalog: {message}"),
        }
    }
}

impl std::error::Error for QuoteError {}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        let exit_code = match &err {
            QuoteError::UnknownService { .. }
            | QuoteError::UnknownSizeCategory { .. }
            | QuoteError::InvalidCatalog(_) => 2,
            QuoteError::EmptyDataset
            | QuoteError::MissingTargetColumn { .. }
            | QuoteError::InvalidRow { .. } => 3,
            QuoteError::ModelNotTrained | QuoteError::FitFailed(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
