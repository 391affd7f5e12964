//! End-to-end evaluation scenarios

use bruter::{run, ValueKind, VMError, VirtualMachine};

use super::vm_with_builtins;

#[test]
fn test_registered_number_evaluates_to_itself() {
    let mut vm = VirtualMachine::new();
    vm.register_number("x", 10.0);
    let slot = vm.eval("x", None).unwrap().unwrap();
    assert_eq!(vm.kind(slot).unwrap(), ValueKind::Number);
    assert_eq!(vm.expect_number(slot).unwrap(), 10.0);
}

#[test]
fn test_builtin_sums_arguments() {
    let mut vm = vm_with_builtins();
    let slot = vm.eval("add 2 3", None).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 5.0);
}

#[test]
fn test_list_literal() {
    let mut vm = VirtualMachine::new();
    let slot = vm.eval("(1 2 3)", None).unwrap().unwrap();
    assert_eq!(vm.kind(slot).unwrap(), ValueKind::List);

    let items = vm.expect_list(slot).unwrap().to_vec();
    assert_eq!(items.len(), 3);
    for (item, expected) in items.iter().zip([1.0, 2.0, 3.0]) {
        assert_eq!(vm.kind(*item).unwrap(), ValueKind::Number);
        assert_eq!(vm.expect_number(*item).unwrap(), expected);
    }
}

#[test]
fn test_undefined_name_leaves_pool_unchanged() {
    let mut vm = vm_with_builtins();
    let before = vm.pool().len();
    assert_eq!(
        vm.eval("undefined_name", None),
        Err(VMError::UndefinedSymbol("undefined_name".to_string()))
    );
    assert_eq!(vm.pool().len(), before);
}

#[test]
fn test_script_with_statements() {
    let mut vm = vm_with_builtins();
    let out = run(&mut vm, "set a 2; set b (add a 3); add a b").unwrap();
    assert_eq!(out.as_deref(), Some("7"));
}

#[test]
fn test_run_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.br");
    std::fs::write(&path, "set greeting 'hello';\ngreeting\n").unwrap();

    let mut vm = vm_with_builtins();
    let out = bruter::run_file(&mut vm, &path).unwrap();
    assert_eq!(out.as_deref(), Some("\"hello\""));
}

#[test]
fn test_run_file_missing() {
    let mut vm = vm_with_builtins();
    let err = bruter::run_file(&mut vm, std::path::Path::new("/no/such/script.br")).unwrap_err();
    assert!(err.to_string().contains("Failed to read file"));
}

#[test]
fn test_independent_vms() {
    let mut a = VirtualMachine::new();
    let mut b = VirtualMachine::new();
    a.register_number("x", 1.0);
    b.register_number("x", 2.0);

    let xa = a.eval("x", None).unwrap().unwrap();
    let xb = b.eval("x", None).unwrap().unwrap();
    assert_eq!(a.expect_number(xa).unwrap(), 1.0);
    assert_eq!(b.expect_number(xb).unwrap(), 2.0);
}

#[test]
fn test_repeated_eval_does_not_grow_pool() {
    let mut vm = vm_with_builtins();
    vm.register_number("n", 1.0);
    let before = vm.pool().len();
    for _ in 0..100 {
        let slot = vm.eval("add (add n 1) (add n 2)", None).unwrap().unwrap();
        vm.unuse_var(slot).unwrap();
    }
    assert_eq!(vm.pool().len(), before);
    // Released slots are recycled rather than growing the pool
    assert!(vm.pool().capacity() < before + 16);
}
