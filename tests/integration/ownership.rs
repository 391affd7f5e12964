//! Slot ownership: duplication, release and host values

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use bruter::{VMError, Value, ValueKind, VirtualMachine};

thread_local! {
    static CLOSED: Cell<u32> = const { Cell::new(0) };
}

struct Handle {
    id: u32,
}

fn close_handle(value: Box<dyn Any>) {
    if let Ok(handle) = value.downcast::<Handle>() {
        CLOSED.with(|c| c.set(c.get() + handle.id));
    }
}

#[test]
fn test_strings_are_copied_in() {
    let mut vm = VirtualMachine::new();
    let mut buffer = String::from("abc");
    let slot = vm.new_string(&buffer);
    buffer.push('!');
    assert_eq!(vm.expect_string(slot).unwrap(), "abc");
}

#[test]
fn test_release_frees_string_once() {
    let mut vm = VirtualMachine::new();
    let slot = vm.new_string("payload");
    vm.unuse_var(slot).unwrap();
    assert_eq!(vm.unuse_var(slot), Err(VMError::InvalidHandle(slot)));
    assert_eq!(vm.pool().stats().strings_released, 1);
}

#[test]
fn test_unuse_tree_releases_nested() {
    let mut vm = VirtualMachine::new();
    let before = vm.pool().len();
    let s = vm.new_string("x");
    let inner = vm.new_list_from(vec![s]);
    let n = vm.new_number(1.0);
    let outer = vm.new_list_from(vec![n, inner]);

    vm.unuse_tree(outer);
    assert_eq!(vm.pool().len(), before);
    assert!(!vm.pool().is_live(s));
}

#[test]
fn test_set_value_on_var() {
    let mut vm = VirtualMachine::new();
    let var = vm.register_var("v");
    assert_eq!(vm.kind(var).unwrap(), ValueKind::Nil);
    vm.set_value(var, Value::Integer(9)).unwrap();
    assert_eq!(vm.expect_integer(var).unwrap(), 9);
    assert_eq!(vm.stringify(var).unwrap(), "9");
}

#[test]
fn test_owned_host_destructor_runs_on_release() {
    let mut vm = VirtualMachine::new();
    let before = CLOSED.with(Cell::get);
    let slot = vm.new_host_owned(Box::new(Handle { id: 3 }), Some(close_handle));
    assert_eq!(vm.stringify(slot).unwrap(), "<host owned>");

    vm.unuse_var(slot).unwrap();
    assert_eq!(CLOSED.with(Cell::get), before + 3);
}

#[test]
fn test_owned_host_without_destructor() {
    let mut vm = VirtualMachine::new();
    let slot = vm.new_host_owned(Box::new(7u64), None);
    let host = vm.value(slot).unwrap().as_host().unwrap();
    assert_eq!(host.downcast_ref::<u64>(), Some(&7));
    vm.unuse_var(slot).unwrap();
}

#[test]
fn test_borrowed_host_outlives_vm() {
    let shared: Rc<dyn Any> = Rc::new(String::from("window"));
    {
        let mut vm = VirtualMachine::new();
        let slot = vm.new_host_borrowed(Rc::clone(&shared));
        vm.hash_set("win", slot);
        let found = vm.eval("win", None).unwrap().unwrap();
        assert_eq!(vm.stringify(found).unwrap(), "<host>");
    }
    assert_eq!(Rc::strong_count(&shared), 1);
    assert_eq!(
        shared.downcast_ref::<String>().map(String::as_str),
        Some("window")
    );
}

#[test]
fn test_duplicate_owned_host_fails() {
    let mut vm = VirtualMachine::new();
    let slot = vm.new_host_owned(Box::new(1u8), None);
    assert!(matches!(vm.duplicate(slot), Err(VMError::Runtime(_))));
}
