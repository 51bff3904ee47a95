/// error types of the fitting routines
pub mod fit_errors;
/// Model trait, built-in model catalog and the registry of models
pub mod models;
/// forward-difference jacobian of a model with respect to its parameters
pub mod jacobian_fd;
#[allow(non_snake_case)]
/// fitting loop: Levenberg-Marquardt with fixed (or optionally adaptive) damping
pub mod LM_fixed_damping;
/// SSE and coefficient of determination
pub mod goodness_of_fit;
/// dense sampling of a fitted model for plotting
pub mod prediction;
/// fitting session owning data, selected model, guesses and the last result
pub mod curve_fitting;
