//! Native function ABI
//!
//! Builtins are the only way to add native behaviour to a VM. A host writes
//! plain Rust functions with the [`NativeFn`] signature and binds them with
//! [`VirtualMachine::register_builtin`] before evaluating any script text.
//!
//! # Calling convention
//!
//! ```text
//! eval("add 2 (add 1 1)")
//!       │
//!       ▼
//! interpret([add, 2, (add 1 1)]) → resolve `add` → native(vm, [2, (add 1 1)], context)
//!                                                        │
//!                                                        ▼
//!                                          builtin calls vm.eval_arg(..) per argument
//! ```
//!
//! Arguments arrive unevaluated: symbols are still symbols and nested
//! expressions are still lists. A builtin decides which arguments to
//! evaluate and in what order, which is how conditionals and other lazy
//! forms are written as plain builtins.
//!
//! Slots a statement allocates are released after it, unless they are
//! reachable from the result, a binding or a retained slot. A builtin that
//! keeps a slot anywhere else (host state, a private context) pins it with
//! [`VirtualMachine::retain`].
//!
//! [`VirtualMachine::register_builtin`]: crate::vm::VirtualMachine::register_builtin
//! [`VirtualMachine::retain`]: crate::vm::VirtualMachine::retain

use std::fmt;

use crate::runtime::memory::Slot;
use crate::runtime::symbols::SymbolTable;
use crate::vm::{VMError, VMResult, VirtualMachine};

/// Native function handler.
///
/// Receives the VM, the raw argument slots and the active local context.
/// Returns the result slot, or `None` when the builtin produces no value.
pub type NativeFn =
    fn(&mut VirtualMachine, &[Slot], Option<&mut SymbolTable>) -> VMResult<Option<Slot>>;

/// Builtin stored in a pool slot
#[derive(Clone)]
pub struct NativeFunction {
    /// Name the builtin was registered under
    pub name: String,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: &str,
        func: NativeFn,
    ) -> Self {
        Self {
            name: name.to_string(),
            func,
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

/// Fail with `ArityMismatch` unless exactly `expected` arguments were passed
pub fn check_arity(
    name: &str,
    args: &[Slot],
    expected: usize,
) -> VMResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(VMError::ArityMismatch {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

/// Fail with `ArityMismatch` when fewer than `minimum` arguments were passed
pub fn check_min_arity(
    name: &str,
    args: &[Slot],
    minimum: usize,
) -> VMResult<()> {
    if args.len() >= minimum {
        Ok(())
    } else {
        Err(VMError::ArityMismatch {
            name: name.to_string(),
            expected: minimum,
            found: args.len(),
        })
    }
}
