//! Tests for datatype handle allocation, reuse and growth stability.

use mpishim::core::constants::{
    DATATYPE_NULL, DATATYPE_VOLATILE_OFFSET, TYPE_DOUBLE, TYPE_INT,
};
use mpishim::runtime::mock::MockRuntime;
use mpishim::shim::Shim;
use mpishim::ShimError;

fn shim() -> Shim<MockRuntime> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut shim = Shim::new(MockRuntime::new());
    shim.init().unwrap();
    shim
}

#[test]
fn test_derived_types_allocate_above_builtin_range() {
    let mut shim = shim();
    let t = shim.type_contiguous(4, TYPE_INT).unwrap();
    assert!(t >= DATATYPE_VOLATILE_OFFSET as i32);
    assert_eq!(shim.type_size(t).unwrap(), 16);
}

#[test]
fn test_freed_middle_slot_is_reused() {
    let mut shim = shim();
    let a = shim.type_contiguous(1, TYPE_INT).unwrap();
    let b = shim.type_contiguous(2, TYPE_INT).unwrap();
    let c = shim.type_contiguous(3, TYPE_INT).unwrap();

    let mut freed = b;
    shim.type_free(&mut freed).unwrap();
    assert_eq!(freed, DATATYPE_NULL);

    // The next allocation reuses the freed middle slot, not a new one.
    let d = shim.type_contiguous(4, TYPE_INT).unwrap();
    assert_eq!(d, b);
    assert_eq!(shim.type_size(a).unwrap(), 4);
    assert_eq!(shim.type_size(c).unwrap(), 12);
    assert_eq!(shim.type_size(d).unwrap(), 16);
}

#[test]
fn test_growth_keeps_existing_handles_valid() {
    let mut shim = shim();
    // The initial pool holds 100 slots with 38 reserved; overshoot it.
    let handles: Vec<(i32, i32)> = (1..=70)
        .map(|count| {
            let h = shim.type_contiguous(count, TYPE_INT).unwrap();
            (h, count * 4)
        })
        .collect();

    for &(h, size) in &handles {
        assert_eq!(shim.type_size(h).unwrap(), size);
    }

    let mut sorted: Vec<i32> = handles.iter().map(|&(h, _)| h).collect();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 70);
}

#[test]
fn test_vector_and_indexed_constructors() {
    let mut shim = shim();
    let v = shim.type_vector(3, 2, 5, TYPE_DOUBLE).unwrap();
    assert_eq!(shim.type_size(v).unwrap(), 48);

    let ix = shim.type_indexed(&[1, 3], &[0, 4], TYPE_INT).unwrap();
    assert_eq!(shim.type_size(ix).unwrap(), 16);

    shim.type_commit(v).unwrap();
    shim.type_commit(ix).unwrap();
}

#[test]
fn test_free_builtin_type_is_rejected() {
    let mut shim = shim();
    let mut t = TYPE_INT;
    assert!(matches!(
        shim.type_free(&mut t),
        Err(ShimError::StaticHandle { .. })
    ));
    assert_eq!(t, TYPE_INT);
    assert_eq!(shim.type_size(TYPE_INT).unwrap(), 4);
}

#[test]
fn test_double_free_is_invalid() {
    let mut shim = shim();
    let t = shim.type_contiguous(2, TYPE_INT).unwrap();
    let mut h = t;
    shim.type_free(&mut h).unwrap();
    let mut stale = t;
    assert!(matches!(
        shim.type_free(&mut stale),
        Err(ShimError::InvalidHandle { .. })
    ));
}

#[test]
fn test_derived_from_derived() {
    let mut shim = shim();
    let pair = shim.type_contiguous(2, TYPE_INT).unwrap();
    let grid = shim.type_contiguous(8, pair).unwrap();
    assert_eq!(shim.type_size(grid).unwrap(), 64);
}

#[test]
fn test_native_type_released_with_handle() {
    let mut shim = shim();
    let live_before = shim.runtime().live_datatypes();
    let mut t = shim.type_contiguous(2, TYPE_INT).unwrap();
    assert_eq!(shim.runtime().live_datatypes(), live_before + 1);
    shim.type_free(&mut t).unwrap();
    assert_eq!(shim.runtime().live_datatypes(), live_before);
}
