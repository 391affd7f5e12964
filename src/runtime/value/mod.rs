//! Core runtime types for Bruter
//!
//! This module provides the value type stored in every pool slot.

pub mod runtime_value;
pub use runtime_value::*;
