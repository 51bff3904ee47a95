//! some linear algebra functions used throughout the code
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// direct solver for small dense systems: Gaussian elimination with partial pivoting
pub mod gauss_elimination;
