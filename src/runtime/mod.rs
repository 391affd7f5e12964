//! Runtime system
//!
//! This module contains the value pool, values, symbol tables and the
//! native function ABI.

pub mod extfunc;
pub mod memory;
pub mod symbols;
pub mod value;
