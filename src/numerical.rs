/// non-linear least squares curve fitting
pub mod optimization;
