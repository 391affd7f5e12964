//! Virtual machine and evaluator
//!
//! A [`VirtualMachine`] owns everything a script can touch: the value pool,
//! the global symbol table and the evaluation depth counter. Nothing is
//! shared between instances, so independent VMs can run side by side.
//!
//! # Evaluation
//!
//! ```text
//! eval("add 2 3", ctx)
//!   │  special_split(';')           one statement at a time
//!   ▼
//! parse → [add, 2, 3]               fresh slots in the pool
//!   ▼
//! interpret → resolve `add` (ctx, then globals)
//!   │           ├─ builtin → native(vm, [2, 3], ctx)
//!   │           └─ value   → the value itself
//!   ▼
//! reclaim slots the statement allocated that are not reachable from the
//! result, a binding or a retained slot
//! ```

use std::any::Any;
use std::rc::Rc;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::frontend::parser::parse;
use crate::runtime::extfunc::{NativeFn, NativeFunction};
use crate::runtime::memory::{Slot, ValuePool};
use crate::runtime::symbols::{self, SymbolTable};
use crate::runtime::value::{
    value_duplicate, HostDestructor, HostValue, OwnedHost, Value, ValueKind,
};
use crate::util::string::special_split;
use crate::vm::errors::{VMError, VMResult};

/// VM configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VMConfig {
    /// Slots reserved up front
    pub initial_capacity: usize,
    /// Maximum nesting of expressions, both while parsing and evaluating
    pub max_depth: usize,
    /// Release unreachable slots once a statement has been evaluated
    pub reclaim_temporaries: bool,
}

impl Default for VMConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_depth: 256,
            reclaim_temporaries: true,
        }
    }
}

/// Evaluated argument list handed around by builtins
pub type ArgSlots = SmallVec<[Slot; 4]>;

/// The scripting virtual machine
#[derive(Debug)]
pub struct VirtualMachine {
    pool: ValuePool,
    globals: SymbolTable,
    config: VMConfig,
    depth: usize,
    /// Slots pinned by the host or a builtin; never reclaimed automatically
    roots: HashSet<Slot>,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualMachine {
    /// Create a VM with the default configuration
    pub fn new() -> Self {
        Self::with_config(VMConfig::default())
    }

    /// Create a VM with a custom configuration
    pub fn with_config(config: VMConfig) -> Self {
        debug!(?config, "vm created");
        Self {
            pool: ValuePool::with_capacity(config.initial_capacity),
            globals: SymbolTable::new(),
            config,
            depth: 0,
            roots: HashSet::new(),
        }
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn pool(&self) -> &ValuePool {
        &self.pool
    }

    pub fn globals(&self) -> &SymbolTable {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut SymbolTable {
        &mut self.globals
    }

    /// Current evaluation nesting
    pub fn depth(&self) -> usize {
        self.depth
    }

    // ------------------------------------------------------------------
    // Slot allocation
    // ------------------------------------------------------------------

    /// Store any value in a fresh slot
    pub fn new_value(
        &mut self,
        value: Value,
    ) -> Slot {
        self.pool.allocate(value)
    }

    pub fn new_number(
        &mut self,
        number: f64,
    ) -> Slot {
        self.pool.allocate(Value::Number(number))
    }

    pub fn new_integer(
        &mut self,
        integer: i64,
    ) -> Slot {
        self.pool.allocate(Value::Integer(integer))
    }

    /// The string is copied; the caller's buffer is never aliased
    pub fn new_string(
        &mut self,
        s: &str,
    ) -> Slot {
        self.pool.allocate(Value::String(s.to_string()))
    }

    pub fn new_builtin(
        &mut self,
        name: &str,
        func: NativeFn,
    ) -> Slot {
        self.pool
            .allocate(Value::Builtin(NativeFunction::new(name, func)))
    }

    /// Empty list
    pub fn new_list(&mut self) -> Slot {
        self.pool.allocate(Value::List(Vec::new()))
    }

    pub fn new_list_from(
        &mut self,
        items: Vec<Slot>,
    ) -> Slot {
        self.pool.allocate(Value::List(items))
    }

    /// Untyped variable, to be filled with [`set_value`](Self::set_value)
    pub fn new_var(&mut self) -> Slot {
        self.pool.allocate(Value::Nil)
    }

    /// Host object the host keeps ownership of
    pub fn new_host_borrowed(
        &mut self,
        object: Rc<dyn Any>,
    ) -> Slot {
        self.pool
            .allocate(Value::Host(HostValue::Borrowed(object)))
    }

    /// Host object handed over to the pool; `destructor` runs on release
    pub fn new_host_owned(
        &mut self,
        object: Box<dyn Any>,
        destructor: Option<HostDestructor>,
    ) -> Slot {
        self.pool.allocate(Value::Host(HostValue::Owned(OwnedHost::new(
            object, destructor,
        ))))
    }

    /// Release a slot. Its string or owned host payload is freed; the slot
    /// may be handed out again by the next allocation.
    pub fn unuse_var(
        &mut self,
        slot: Slot,
    ) -> VMResult<()> {
        self.pool.release(slot)?;
        self.roots.remove(&slot);
        Ok(())
    }

    /// Pin a slot so statement reclamation never releases it.
    ///
    /// A builtin that hands a slot to the host outside the pool, or binds it
    /// in a context the statement does not see, retains it. The slot stays
    /// allocated until [`release_root`](Self::release_root) and
    /// [`unuse_var`](Self::unuse_var).
    pub fn retain(
        &mut self,
        slot: Slot,
    ) -> VMResult<()> {
        if !self.pool.is_live(slot) {
            return Err(VMError::InvalidHandle(slot));
        }
        self.roots.insert(slot);
        Ok(())
    }

    /// Unpin a slot; returns whether it was pinned. The slot is not released.
    pub fn release_root(
        &mut self,
        slot: Slot,
    ) -> bool {
        self.roots.remove(&slot)
    }

    pub fn is_retained(
        &self,
        slot: Slot,
    ) -> bool {
        self.roots.contains(&slot)
    }

    /// Release a slot and, if it is a list, every slot nested in it.
    /// Slots that are already free are skipped.
    pub fn unuse_tree(
        &mut self,
        slot: Slot,
    ) {
        let mut pending = vec![slot];
        while let Some(slot) = pending.pop() {
            if let Ok(Value::List(items)) = self.pool.get(slot) {
                pending.extend(items.iter().copied());
            }
            if self.pool.release(slot).is_ok() {
                self.roots.remove(&slot);
            }
        }
    }

    /// Copy the value of `slot` into a new slot
    pub fn duplicate(
        &mut self,
        slot: Slot,
    ) -> VMResult<Slot> {
        let value = value_duplicate(self.pool.get(slot)?)?;
        Ok(self.pool.allocate(value))
    }

    pub fn value(
        &self,
        slot: Slot,
    ) -> VMResult<&Value> {
        self.pool.get(slot)
    }

    pub fn value_mut(
        &mut self,
        slot: Slot,
    ) -> VMResult<&mut Value> {
        self.pool.get_mut(slot)
    }

    pub fn kind(
        &self,
        slot: Slot,
    ) -> VMResult<ValueKind> {
        self.pool.kind(slot)
    }

    /// Overwrite the value held by a live slot
    pub fn set_value(
        &mut self,
        slot: Slot,
        value: Value,
    ) -> VMResult<()> {
        self.pool.replace(slot, value).map(drop)
    }

    /// Append `item` to the list in `list`
    pub fn list_push(
        &mut self,
        list: Slot,
        item: Slot,
    ) -> VMResult<()> {
        match self.pool.get_mut(list)? {
            Value::List(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(VMError::TypeMismatch {
                expected: ValueKind::List,
                found: other.kind(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Global bindings
    // ------------------------------------------------------------------

    pub fn hash_find(
        &self,
        key: &str,
    ) -> Option<Slot> {
        self.globals.find(key)
    }

    /// Bind `key` globally, returning the slot it was bound to before.
    /// The previous slot is not released.
    pub fn hash_set(
        &mut self,
        key: &str,
        slot: Slot,
    ) -> Option<Slot> {
        self.globals.set(key, slot)
    }

    /// Remove a global binding without releasing its slot
    pub fn hash_unset(
        &mut self,
        key: &str,
    ) -> Option<Slot> {
        self.globals.unset(key)
    }

    fn register(
        &mut self,
        name: &str,
        value: Value,
    ) -> Slot {
        let slot = self.pool.allocate(value);
        if let Some(previous) = self.globals.set(name, slot) {
            debug!(name, %previous, "global rebound; previous slot left allocated");
        }
        slot
    }

    pub fn register_var(
        &mut self,
        name: &str,
    ) -> Slot {
        self.register(name, Value::Nil)
    }

    pub fn register_number(
        &mut self,
        name: &str,
        number: f64,
    ) -> Slot {
        self.register(name, Value::Number(number))
    }

    pub fn register_integer(
        &mut self,
        name: &str,
        integer: i64,
    ) -> Slot {
        self.register(name, Value::Integer(integer))
    }

    pub fn register_string(
        &mut self,
        name: &str,
        s: &str,
    ) -> Slot {
        self.register(name, Value::String(s.to_string()))
    }

    pub fn register_list(
        &mut self,
        name: &str,
    ) -> Slot {
        self.register(name, Value::List(Vec::new()))
    }

    /// Bind a native function under `name`; the sole extension hook
    pub fn register_builtin(
        &mut self,
        name: &str,
        func: NativeFn,
    ) -> Slot {
        debug!(name, "register builtin");
        self.register(name, Value::Builtin(NativeFunction::new(name, func)))
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Resolve a name through `context`, then the global table
    pub fn resolve(
        &self,
        name: &str,
        context: Option<&SymbolTable>,
    ) -> VMResult<Slot> {
        symbols::resolve(name, context, &self.globals)
            .ok_or_else(|| VMError::UndefinedSymbol(name.to_string()))
    }

    /// Evaluate command text.
    ///
    /// Statements separated by `;` run in order; the result of the last one
    /// is returned. `None` means the text was empty or the final builtin
    /// produced no value.
    pub fn eval(
        &mut self,
        source: &str,
        mut context: Option<&mut SymbolTable>,
    ) -> VMResult<Option<Slot>> {
        let statements = special_split(source, ';')?;
        let last = statements.len().saturating_sub(1);
        let mut result = None;
        for (i, statement) in statements.iter().enumerate() {
            result = self.eval_statement(statement, context.as_deref_mut(), i == last)?;
        }
        Ok(result)
    }

    fn eval_statement(
        &mut self,
        statement: &str,
        mut context: Option<&mut SymbolTable>,
        keep_result: bool,
    ) -> VMResult<Option<Slot>> {
        if !self.config.reclaim_temporaries {
            let expr = parse(self, statement)?;
            return self.interpret(&expr, context);
        }

        let mark = self.pool.begin_journal();
        let outcome = match parse(self, statement) {
            Ok(expr) => self.interpret(&expr, context.as_deref_mut()),
            Err(err) => Err(err),
        };
        let allocated = self.pool.end_journal(mark);

        let keep = match &outcome {
            Ok(Some(slot)) if keep_result => Some(*slot),
            _ => None,
        };
        let survivors = self.reclaim(&allocated, keep, context.as_deref());
        self.pool.record(&survivors);
        outcome
    }

    /// Evaluate a parsed expression.
    ///
    /// The first element is the operator. A symbol is resolved (context
    /// first); a builtin is called with the remaining elements, unevaluated;
    /// any other value is the result itself.
    pub fn interpret(
        &mut self,
        expr: &[Slot],
        context: Option<&mut SymbolTable>,
    ) -> VMResult<Option<Slot>> {
        let Some((&head, args)) = expr.split_first() else {
            return Ok(None);
        };

        if self.depth >= self.config.max_depth {
            warn!(depth = self.depth, "evaluation depth limit reached");
            return Err(VMError::StackOverflow(self.config.max_depth));
        }
        self.depth += 1;
        let outcome = self.dispatch(head, args, context);
        self.depth -= 1;
        outcome
    }

    fn dispatch(
        &mut self,
        head: Slot,
        args: &[Slot],
        context: Option<&mut SymbolTable>,
    ) -> VMResult<Option<Slot>> {
        let operator = self.resolve_slot(head, context.as_deref())?;
        let func = match self.pool.get(operator)? {
            Value::Builtin(native) => {
                trace!(name = %native.name, args = args.len(), depth = self.depth, "call builtin");
                native.func
            }
            _ => return Ok(Some(operator)),
        };
        func(self, args, context)
    }

    /// Symbols resolve to their binding; every other slot is itself
    fn resolve_slot(
        &self,
        slot: Slot,
        context: Option<&SymbolTable>,
    ) -> VMResult<Slot> {
        match self.pool.get(slot)? {
            Value::Symbol(name) => self.resolve(name, context),
            _ => Ok(slot),
        }
    }

    /// Evaluate one builtin argument: symbols resolve, lists are interpreted
    /// as sub-expressions, anything else is returned as is.
    pub fn eval_arg(
        &mut self,
        slot: Slot,
        context: Option<&mut SymbolTable>,
    ) -> VMResult<Slot> {
        let items = match self.pool.get(slot)? {
            Value::Symbol(name) => return self.resolve(name, context.as_deref()),
            Value::List(items) => items.clone(),
            _ => return Ok(slot),
        };
        self.interpret(&items, context)?.ok_or(VMError::NoValue)
    }

    /// Evaluate every argument left to right
    pub fn eval_args(
        &mut self,
        args: &[Slot],
        mut context: Option<&mut SymbolTable>,
    ) -> VMResult<ArgSlots> {
        args.iter()
            .map(|&arg| self.eval_arg(arg, context.as_deref_mut()))
            .collect()
    }

    /// Evaluate an argument and require a number
    pub fn eval_number(
        &mut self,
        slot: Slot,
        context: Option<&mut SymbolTable>,
    ) -> VMResult<f64> {
        let slot = self.eval_arg(slot, context)?;
        self.expect_number(slot)
    }

    pub fn expect_number(
        &self,
        slot: Slot,
    ) -> VMResult<f64> {
        match self.pool.get(slot)? {
            Value::Number(n) => Ok(*n),
            other => Err(VMError::TypeMismatch {
                expected: ValueKind::Number,
                found: other.kind(),
            }),
        }
    }

    pub fn expect_integer(
        &self,
        slot: Slot,
    ) -> VMResult<i64> {
        match self.pool.get(slot)? {
            Value::Integer(i) => Ok(*i),
            other => Err(VMError::TypeMismatch {
                expected: ValueKind::Integer,
                found: other.kind(),
            }),
        }
    }

    pub fn expect_string(
        &self,
        slot: Slot,
    ) -> VMResult<&str> {
        match self.pool.get(slot)? {
            Value::String(s) => Ok(s),
            other => Err(VMError::TypeMismatch {
                expected: ValueKind::String,
                found: other.kind(),
            }),
        }
    }

    pub fn expect_list(
        &self,
        slot: Slot,
    ) -> VMResult<&[Slot]> {
        match self.pool.get(slot)? {
            Value::List(items) => Ok(items),
            other => Err(VMError::TypeMismatch {
                expected: ValueKind::List,
                found: other.kind(),
            }),
        }
    }

    /// Name carried by an unevaluated symbol argument
    pub fn expect_symbol(
        &self,
        slot: Slot,
    ) -> VMResult<&str> {
        match self.pool.get(slot)? {
            Value::Symbol(name) => Ok(name),
            other => Err(VMError::TypeMismatch {
                expected: ValueKind::Symbol,
                found: other.kind(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Reclamation
    // ------------------------------------------------------------------

    /// Whether `slot` is reachable, through lists, from a global binding, a
    /// binding of `context`, or a retained slot
    pub fn is_reachable(
        &self,
        slot: Slot,
        context: Option<&SymbolTable>,
    ) -> bool {
        self.reachable(None, context).contains(&slot)
    }

    fn reachable(
        &self,
        extra: Option<Slot>,
        context: Option<&SymbolTable>,
    ) -> HashSet<Slot> {
        let mut pending: Vec<Slot> = extra.into_iter().collect();
        pending.extend(self.globals.slots());
        pending.extend(self.roots.iter().copied());
        if let Some(ctx) = context {
            pending.extend(ctx.slots());
        }

        let mut reachable: HashSet<Slot> = HashSet::new();
        while let Some(slot) = pending.pop() {
            if !reachable.insert(slot) {
                continue;
            }
            if let Ok(Value::List(items)) = self.pool.get(slot) {
                pending.extend(items.iter().copied());
            }
        }
        reachable
    }

    /// Release the slots a statement allocated that nothing kept. Roots are
    /// the result, every binding of the global table and the context, and
    /// the retained slots; anything reachable from a root through lists
    /// survives. Returns the surviving slots.
    fn reclaim(
        &mut self,
        allocated: &[Slot],
        result: Option<Slot>,
        context: Option<&SymbolTable>,
    ) -> Vec<Slot> {
        let reachable = self.reachable(result, context);

        let mut survivors = Vec::new();
        let mut released = 0usize;
        for &slot in allocated {
            if reachable.contains(&slot) {
                if self.pool.is_live(slot) {
                    survivors.push(slot);
                }
            } else if self.pool.release(slot).is_ok() {
                released += 1;
            }
        }
        trace!(released, kept = survivors.len(), "reclaim temporaries");
        survivors
    }
}
