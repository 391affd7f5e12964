//! Value pool tests

use proptest::prelude::*;

use crate::runtime::memory::{PoolStats, Slot, ValuePool};
use crate::runtime::value::{Value, ValueKind};
use crate::vm::VMError;

#[test]
fn test_pool_new() {
    let pool = ValuePool::new();
    assert!(pool.is_empty());
    assert_eq!(pool.capacity(), 0);
    assert_eq!(pool.stats(), PoolStats::default());
}

#[test]
fn test_allocate_and_get() {
    let mut pool = ValuePool::with_capacity(4);
    let a = pool.allocate(Value::Number(1.5));
    let b = pool.allocate(Value::String("hi".to_string()));

    assert_eq!(pool.len(), 2);
    assert_eq!(pool.get(a).unwrap().as_number(), Some(1.5));
    assert_eq!(pool.get(b).unwrap().as_str(), Some("hi"));
    assert_eq!(pool.kind(b).unwrap(), ValueKind::String);
}

#[test]
fn test_release_reuses_index() {
    let mut pool = ValuePool::new();
    let a = pool.allocate(Value::Number(1.0));
    let _b = pool.allocate(Value::Number(2.0));
    pool.release(a).unwrap();
    assert_eq!(pool.free_count(), 1);

    let c = pool.allocate(Value::Integer(3));
    assert_eq!(c.index(), a.index());
    assert_ne!(c.generation(), a.generation());
    assert_eq!(pool.capacity(), 2);
    assert_eq!(pool.free_count(), 0);
    assert_eq!(pool.stats().reused, 1);
}

#[test]
fn test_stale_handle() {
    let mut pool = ValuePool::new();
    let a = pool.allocate(Value::Number(1.0));
    pool.release(a).unwrap();
    let _c = pool.allocate(Value::Number(2.0));

    assert!(!pool.is_live(a));
    assert!(matches!(pool.get(a), Err(VMError::InvalidHandle(s)) if s == a));
    assert_eq!(pool.release(a), Err(VMError::InvalidHandle(a)));
}

#[test]
fn test_double_release() {
    let mut pool = ValuePool::new();
    let a = pool.allocate(Value::Nil);
    assert!(pool.release(a).is_ok());
    assert_eq!(pool.release(a), Err(VMError::InvalidHandle(a)));
    assert_eq!(pool.free_count(), 1);
    assert_eq!(pool.stats().released, 1);
}

#[test]
fn test_out_of_range_handle() {
    let mut pool = ValuePool::new();
    let bogus = Slot::new(42, 0);
    assert!(pool.get(bogus).is_err());
    assert!(pool.release(bogus).is_err());
}

#[test]
fn test_replace() {
    let mut pool = ValuePool::new();
    let a = pool.allocate(Value::Nil);
    let old = pool.replace(a, Value::Number(9.0)).unwrap();
    assert_eq!(old.kind(), ValueKind::Nil);
    assert_eq!(pool.kind(a).unwrap(), ValueKind::Number);
}

#[test]
fn test_string_ownership_counters() {
    let mut pool = ValuePool::new();
    let s = pool.allocate(Value::String("abc".to_string()));
    let n = pool.allocate(Value::Number(1.0));
    pool.release(s).unwrap();
    pool.release(n).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.strings_allocated, 1);
    assert_eq!(stats.strings_released, 1);
    assert_eq!(stats.allocated, 2);
    assert_eq!(stats.released, 2);
}

#[test]
fn test_journal_nesting() {
    let mut pool = ValuePool::new();
    let _outside = pool.allocate(Value::Nil);

    let outer = pool.begin_journal();
    let a = pool.allocate(Value::Nil);
    let inner = pool.begin_journal();
    let b = pool.allocate(Value::Nil);
    assert_eq!(pool.end_journal(inner), vec![b]);

    pool.record(&[b]);
    assert_eq!(pool.end_journal(outer), vec![a, b]);

    // Closed journals record nothing
    let _c = pool.allocate(Value::Nil);
    pool.record(&[a]);
    let mark = pool.begin_journal();
    assert!(pool.end_journal(mark).is_empty());
}

#[test]
fn test_slots_iterates_live_only() {
    let mut pool = ValuePool::new();
    let a = pool.allocate(Value::Nil);
    let b = pool.allocate(Value::Nil);
    let c = pool.allocate(Value::Nil);
    pool.release(b).unwrap();
    assert_eq!(pool.slots().collect::<Vec<_>>(), vec![a, c]);
}

#[derive(Debug, Clone)]
enum Op {
    Allocate(i64),
    Release(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Allocate),
        (0usize..32).prop_map(Op::Release),
    ]
}

proptest! {
    /// Live handles always read back the value they were allocated with,
    /// whatever mix of allocations and releases came before.
    #[test]
    fn prop_slot_reuse_never_aliases(ops in proptest::collection::vec(op_strategy(), 0..128)) {
        let mut pool = ValuePool::new();
        let mut live: Vec<(Slot, i64)> = Vec::new();
        let mut dead: Vec<Slot> = Vec::new();

        for op in ops {
            match op {
                Op::Allocate(n) => {
                    let slot = pool.allocate(Value::Integer(n));
                    live.push((slot, n));
                }
                Op::Release(i) if !live.is_empty() => {
                    let (slot, _) = live.swap_remove(i % live.len());
                    prop_assert!(pool.release(slot).is_ok());
                    dead.push(slot);
                }
                Op::Release(_) => {}
            }
        }

        prop_assert_eq!(pool.len(), live.len());
        prop_assert_eq!(pool.len() + pool.free_count(), pool.capacity());
        for (slot, n) in &live {
            prop_assert_eq!(pool.get(*slot).unwrap().as_integer(), Some(*n));
        }
        for slot in &dead {
            prop_assert!(!pool.is_live(*slot));
        }
    }
}
