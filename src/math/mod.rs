//! Numerical routines.

pub mod ols;

pub use ols::solve_least_squares;
