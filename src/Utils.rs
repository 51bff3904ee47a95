//! different utility modules used throughout the project
/// logger setup and CSV export of fit results
pub mod logger;
/// tiny module to plot data points with the fitted curve
pub mod plots;
/// parse pasted two-column "x,y" text into data vectors
pub mod data_parser;
/// TOML settings of the fitting routines and of the command line task
pub mod fit_config;
