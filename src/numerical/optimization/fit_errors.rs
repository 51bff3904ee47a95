use std::fmt;

/// Error types reported by a model evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// the parameter vector has the wrong length for this model
    WrongParameterCount {
        model: String,
        expected: usize,
        got: usize,
    },
    /// the model could not be evaluated at the given point
    Evaluation {
        model: String,
        x: f64,
        message: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::WrongParameterCount {
                model,
                expected,
                got,
            } => write!(
                f,
                "model '{}' expects {} parameters, got {}",
                model, expected, got
            ),
            ModelError::Evaluation { model, x, message } => {
                write!(f, "model '{}' failed at x = {}: {}", model, x, message)
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// Error types for the fitting routines and the session layer around them
#[derive(Debug)]
pub enum FitError {
    Model(ModelError),
    LengthMismatch { x_len: usize, y_len: usize },
    TooFewPoints { required: usize, got: usize },
    UnknownModel(String),
    NoData,
    NoFitResult,
    Parse(String),
    Config(String),
    Io(std::io::Error),
    Csv(csv::Error),
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FitError::Model(e) => write!(f, "{}", e),
            FitError::LengthMismatch { x_len, y_len } => write!(
                f,
                "x and y data must have the same length ({} != {})",
                x_len, y_len
            ),
            FitError::TooFewPoints { required, got } => write!(
                f,
                "at least {} data points are required for fitting, got {}",
                required, got
            ),
            FitError::UnknownModel(id) => write!(f, "unknown model: {}", id),
            FitError::NoData => write!(f, "no valid data points"),
            FitError::NoFitResult => write!(f, "no fit has been performed yet"),
            FitError::Parse(msg) => write!(f, "parse error: {}", msg),
            FitError::Config(msg) => write!(f, "config error: {}", msg),
            FitError::Io(e) => write!(f, "io error: {}", e),
            FitError::Csv(e) => write!(f, "csv error: {}", e),
        }
    }
}

impl std::error::Error for FitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FitError::Model(e) => Some(e),
            FitError::Io(e) => Some(e),
            FitError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for FitError {
    fn from(e: ModelError) -> Self {
        FitError::Model(e)
    }
}

impl From<std::io::Error> for FitError {
    fn from(e: std::io::Error) -> Self {
        FitError::Io(e)
    }
}

impl From<csv::Error> for FitError {
    fn from(e: csv::Error) -> Self {
        FitError::Csv(e)
    }
}

/// x and y must be parallel arrays
pub(crate) fn check_lengths(x_data: &[f64], y_data: &[f64]) -> Result<(), FitError> {
    if x_data.len() != y_data.len() {
        return Err(FitError::LengthMismatch {
            x_len: x_data.len(),
            y_len: y_data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_converts_and_keeps_source() {
        let err: FitError = ModelError::WrongParameterCount {
            model: "linear".to_string(),
            expected: 2,
            got: 3,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "model 'linear' expects 2 parameters, got 3"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn length_check() {
        assert!(check_lengths(&[1.0, 2.0], &[1.0, 2.0]).is_ok());
        match check_lengths(&[1.0, 2.0], &[1.0]) {
            Err(FitError::LengthMismatch { x_len, y_len }) => {
                assert_eq!((x_len, y_len), (2, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
