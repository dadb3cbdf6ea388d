//! Implementation of chess environment, its rules and specifics.

pub mod attacks;
pub mod board;
pub mod core;
pub mod movegen;
pub mod moves;
pub mod position;
pub mod special;
