//! Error reporting and recovery

use bruter::{run, VMConfig, VMError, ValueKind, VirtualMachine};

use super::{builtin_add, vm_with_builtins};

#[test]
fn test_unterminated_group() {
    let mut vm = vm_with_builtins();
    let before = vm.pool().len();
    for source in ["add (1 2", "add 1 [2", "\"open", "add (1 2]", "add 1)"] {
        assert!(
            matches!(vm.eval(source, None), Err(VMError::UnterminatedExpression(_))),
            "{source}"
        );
    }
    assert_eq!(vm.pool().len(), before);
}

#[test]
fn test_type_mismatch_names_kinds() {
    let mut vm = vm_with_builtins();
    // `((1 2))` evaluates to the list `(1 2)`; `(1 2)` alone would yield 1
    let err = vm.eval("add ((1 2)) 1", None).unwrap_err();
    assert_eq!(err, VMError::TypeMismatch {
        expected: ValueKind::Number,
        found: ValueKind::List,
    });
    assert_eq!(
        err.to_string(),
        "Type mismatch: expected number, found list"
    );
}

#[test]
fn test_vm_usable_after_error() {
    let mut vm = vm_with_builtins();
    assert!(vm.eval("add missing 1", None).is_err());
    assert_eq!(vm.depth(), 0);
    let slot = vm.eval("add 1 1", None).unwrap().unwrap();
    assert_eq!(vm.expect_number(slot).unwrap(), 2.0);
}

#[test]
fn test_error_stops_remaining_statements() {
    let mut vm = vm_with_builtins();
    assert!(vm.eval("set a 1; missing; set b 2", None).is_err());
    assert!(vm.hash_find("a").is_some());
    assert!(vm.hash_find("b").is_none());
}

#[test]
fn test_depth_limit_from_config() {
    let mut vm = VirtualMachine::with_config(VMConfig {
        max_depth: 4,
        ..VMConfig::default()
    });
    vm.register_builtin("add", builtin_add);
    assert!(vm.eval("add 1 (add 1 1)", None).is_ok());
    assert_eq!(
        vm.eval("add 1 (add 1 (add 1 (add 1 (add 1 1))))", None),
        Err(VMError::StackOverflow(4))
    );
}

#[test]
fn test_anyhow_entry_point_reports_vm_error() {
    let mut vm = vm_with_builtins();
    let err = run(&mut vm, "nope").unwrap_err();
    assert_eq!(
        err.downcast_ref::<VMError>(),
        Some(&VMError::UndefinedSymbol("nope".to_string()))
    );
}
