//! Bruter scripting runtime
//!
//! A small embeddable interpreter: the host creates a [`VirtualMachine`],
//! registers native builtins and evaluates command text. Every value lives
//! in a slot of the VM's value pool and is addressed by a [`Slot`] handle.
//!
//! # Example
//!
//! ```rust
//! use bruter::{check_arity, Slot, SymbolTable, VMResult, VirtualMachine};
//!
//! fn add(
//!     vm: &mut VirtualMachine,
//!     args: &[Slot],
//!     mut ctx: Option<&mut SymbolTable>,
//! ) -> VMResult<Option<Slot>> {
//!     check_arity("add", args, 2)?;
//!     let a = vm.eval_number(args[0], ctx.as_deref_mut())?;
//!     let b = vm.eval_number(args[1], ctx.as_deref_mut())?;
//!     Ok(Some(vm.new_number(a + b)))
//! }
//!
//! let mut vm = VirtualMachine::new();
//! vm.register_builtin("add", add);
//! let result = vm.eval("add 2 3", None).unwrap().unwrap();
//! assert_eq!(vm.stringify(result).unwrap(), "5");
//! ```

#![doc(html_root_url = "https://docs.rs/bruter")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod frontend;
pub mod runtime;
pub mod vm;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use frontend::{parse, Expression};
pub use runtime::extfunc::{check_arity, check_min_arity, NativeFn, NativeFunction};
pub use runtime::memory::{PoolStats, Slot, ValuePool};
pub use runtime::symbols::SymbolTable;
pub use runtime::value::{HostValue, Value, ValueKind};
pub use vm::{ArgSlots, VMConfig, VMError, VMResult, VirtualMachine};

use ::std::fs;
use ::std::path::Path;

use tracing::debug;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime name
pub const NAME: &str = "Bruter";

/// Evaluate source text on `vm` and render the result, if any
///
/// # Example
///
/// ```no_run
/// use bruter::{run, Result, VirtualMachine};
///
/// fn main() -> Result<()> {
///     let mut vm = VirtualMachine::new();
///     vm.register_number("answer", 42.0);
///     assert_eq!(run(&mut vm, "answer")?.as_deref(), Some("42"));
///     Ok(())
/// }
/// ```
pub fn run(
    vm: &mut VirtualMachine,
    source: &str,
) -> Result<Option<String>> {
    debug!(len = source.len(), "run source");
    let result = vm.eval(source, None)?;
    debug!(live = vm.pool().len(), "run complete");
    result.map(|slot| vm.stringify(slot)).transpose().map_err(Into::into)
}

/// Evaluate a script file on `vm`
pub fn run_file(
    vm: &mut VirtualMachine,
    path: &Path,
) -> Result<Option<String>> {
    debug!(path = %path.display(), "run file");
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    run(vm, &source)
}
