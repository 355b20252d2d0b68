//! Time management and shared conversions

pub mod time;
