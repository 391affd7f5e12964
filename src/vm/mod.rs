//! Virtual machine and expression evaluation
//!
//! This module contains the VM instance, the evaluator and its errors.

pub use executor::{ArgSlots, VMConfig, VirtualMachine};
pub use errors::{VMError, VMResult};

mod errors;
mod executor;
mod stringify;
