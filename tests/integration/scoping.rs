//! Local context versus global table

use bruter::{SymbolTable, VMError};

use super::vm_with_builtins;

#[test]
fn test_local_binding_shadows_global_only_during_call() {
    let mut vm = vm_with_builtins();
    vm.register_number("arg", 1.0);

    // Inside `call`, `arg` is the local binding
    let slot = vm.eval("call 41 (add arg 1)", None).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 42.0);

    // Afterwards the global is visible again
    let slot = vm.eval("add arg 1", None).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 2.0);
}

#[test]
fn test_local_binding_invisible_outside() {
    let mut vm = vm_with_builtins();
    vm.eval("call 5 (set inner arg)", None).unwrap();
    assert!(vm.hash_find("inner").is_none());
    assert_eq!(
        vm.eval("inner", None),
        Err(VMError::UndefinedSymbol("inner".to_string()))
    );
}

#[test]
fn test_host_supplied_context() {
    let mut vm = vm_with_builtins();
    vm.register_number("x", 1.0);
    let local = vm.new_number(10.0);
    let mut ctx = SymbolTable::new();
    ctx.set("x", local);

    assert_eq!(vm.resolve("x", Some(&ctx)).unwrap(), local);
    let slot = vm.eval("add x x", Some(&mut ctx)).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 20.0);

    ctx.unset("x");
    let slot = vm.eval("add x x", Some(&mut ctx)).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 2.0);
}

#[test]
fn test_global_rebinding_replaces_lookup() {
    let mut vm = vm_with_builtins();
    vm.register_number("x", 1.0);
    vm.register_number("x", 2.0);
    let slot = vm.eval("x", None).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 2.0);
    assert_eq!(vm.globals().len(), 4);
}
