//! Text rendering of slots
//!
//! Parsed values render back to text the parser accepts: numbers in
//! shortest round-trip form, strings quoted, lists in parentheses, symbols
//! bare. A string containing both quote characters cannot be rendered
//! re-parseably.

use crate::runtime::memory::Slot;
use crate::runtime::value::{HostValue, Value};
use crate::vm::{VMError, VMResult, VirtualMachine};

impl VirtualMachine {
    /// Render one slot
    pub fn stringify(
        &self,
        slot: Slot,
    ) -> VMResult<String> {
        let mut out = String::new();
        self.write_slot(&mut out, slot, 0)?;
        Ok(out)
    }

    /// Render an expression as command text: elements separated by spaces,
    /// without surrounding parentheses
    pub fn list_stringify(
        &self,
        expr: &[Slot],
    ) -> VMResult<String> {
        let mut out = String::new();
        self.write_items(&mut out, expr, 0)?;
        Ok(out)
    }

    /// Print one slot to stdout
    pub fn print_element(
        &self,
        slot: Slot,
    ) -> VMResult<()> {
        println!("{}", self.stringify(slot)?);
        Ok(())
    }

    fn write_items(
        &self,
        out: &mut String,
        items: &[Slot],
        depth: usize,
    ) -> VMResult<()> {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write_slot(out, item, depth)?;
        }
        Ok(())
    }

    fn write_slot(
        &self,
        out: &mut String,
        slot: Slot,
        depth: usize,
    ) -> VMResult<()> {
        // Lists can be made to contain themselves through `list_push`.
        if depth >= self.config().max_depth {
            return Err(VMError::StackOverflow(self.config().max_depth));
        }
        match self.value(slot)? {
            Value::Nil => out.push_str("nil"),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Integer(i) => out.push_str(&i.to_string()),
            Value::String(s) => {
                let quote = if s.contains('"') { '\'' } else { '"' };
                out.push(quote);
                out.push_str(s);
                out.push(quote);
            }
            Value::Symbol(name) => out.push_str(name),
            Value::List(items) => {
                out.push('(');
                self.write_items(out, items, depth + 1)?;
                out.push(')');
            }
            Value::Builtin(native) => {
                out.push_str("<builtin ");
                out.push_str(&native.name);
                out.push('>');
            }
            Value::Host(HostValue::Borrowed(_)) => out.push_str("<host>"),
            Value::Host(HostValue::Owned(_)) => out.push_str("<host owned>"),
        }
        Ok(())
    }
}
