//! Tests for communicator/group lifecycle through the public shim API.

use mpishim::core::constants::{
    COMM_NULL, COMM_WORLD, CONGRUENT, GROUP_EMPTY, GROUP_NULL, IDENT, UNDEFINED,
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
fn test_world_size_and_rank() {
    let mut shim = shim();
    assert_eq!(shim.comm_size(COMM_WORLD).unwrap(), 4);
    assert_eq!(shim.comm_rank(COMM_WORLD).unwrap(), 0);
}

#[test]
fn test_split_dup_free_reference_conservation() {
    let mut shim = shim();
    // Groups live after init: empty, world, self.
    let groups_before = shim.runtime().live_groups();

    // A split produces a brand-new communicator with its own group.
    let split = shim.comm_split(COMM_WORLD, 1, 0).unwrap();
    let group = shim.session().unwrap().comm_group_handle(split).unwrap();
    assert_eq!(shim.session().unwrap().group_refs(group).unwrap(), 1);

    // Duplicating shares the group, raising its count.
    let dup = shim.comm_dup(split).unwrap();
    assert_eq!(shim.session().unwrap().group_refs(group).unwrap(), 2);
    assert_eq!(
        shim.session().unwrap().comm_group_handle(dup).unwrap(),
        group
    );

    // Free the duplicate: count drops, group survives.
    let mut handle = dup;
    shim.comm_free(&mut handle).unwrap();
    assert_eq!(handle, COMM_NULL);
    assert_eq!(shim.session().unwrap().group_refs(group).unwrap(), 1);

    // Free the original: count reaches zero, native group released.
    let mut handle = split;
    shim.comm_free(&mut handle).unwrap();
    assert!(shim.session().unwrap().group_refs(group).is_err());
    assert_eq!(shim.runtime().live_groups(), groups_before);
}

#[test]
fn test_split_with_undefined_color_yields_null() {
    let mut shim = shim();
    let comm = shim.comm_split(COMM_WORLD, UNDEFINED, 0).unwrap();
    assert_eq!(comm, COMM_NULL);
}

#[test]
fn test_comm_create_with_empty_group_yields_null() {
    let mut shim = shim();
    let comm = shim.comm_create(COMM_WORLD, GROUP_EMPTY).unwrap();
    assert_eq!(comm, COMM_NULL);
}

#[test]
fn test_comm_create_from_subgroup() {
    let mut shim = shim();
    let mut world_group = shim.comm_group(COMM_WORLD).unwrap();
    let mut sub = shim.group_incl(world_group, &[0, 1]).unwrap();
    let created = shim.comm_create(COMM_WORLD, sub).unwrap();
    assert_ne!(created, COMM_NULL);
    assert_eq!(shim.comm_size(created).unwrap(), 4);

    let mut handle = created;
    shim.comm_free(&mut handle).unwrap();
    shim.group_free(&mut sub).unwrap();
    shim.group_free(&mut world_group).unwrap();
}

#[test]
fn test_free_predefined_comm_is_rejected() {
    let mut shim = shim();
    let mut world = COMM_WORLD;
    let err = shim.comm_free(&mut world).unwrap_err();
    assert!(matches!(err, ShimError::StaticHandle { .. }));
    // The handle is untouched and still usable.
    assert_eq!(world, COMM_WORLD);
    assert_eq!(shim.comm_size(COMM_WORLD).unwrap(), 4);
}

#[test]
fn test_double_free_is_deterministic_error() {
    let mut shim = shim();
    let split = shim.comm_split(COMM_WORLD, 0, 0).unwrap();
    let mut handle = split;
    shim.comm_free(&mut handle).unwrap();
    // The original handle value now names a free slot.
    let mut stale = split;
    assert!(matches!(
        shim.comm_free(&mut stale),
        Err(ShimError::InvalidHandle { .. })
    ));
}

#[test]
fn test_comparison_results_are_translated() {
    let mut shim = shim();
    assert_eq!(shim.comm_compare(COMM_WORLD, COMM_WORLD).unwrap(), IDENT);
    let dup = shim.comm_dup(COMM_WORLD).unwrap();
    assert_eq!(shim.comm_compare(dup, COMM_WORLD).unwrap(), CONGRUENT);
}

#[test]
fn test_dup_of_world_shares_predefined_group() {
    let mut shim = shim();
    let world_group = shim.session().unwrap().comm_group_handle(COMM_WORLD).unwrap();
    let dup = shim.comm_dup(COMM_WORLD).unwrap();
    assert_eq!(shim.session().unwrap().group_refs(world_group).unwrap(), 2);

    let mut handle = dup;
    shim.comm_free(&mut handle).unwrap();
    // Predefined group survives its last dynamic owner.
    assert_eq!(shim.session().unwrap().group_refs(world_group).unwrap(), 1);
    assert!(shim.session().unwrap().group(world_group).is_ok());
}

#[test]
fn test_group_operations() {
    let mut shim = shim();
    let mut world_group = shim.comm_group(COMM_WORLD).unwrap();
    assert_eq!(shim.group_rank(world_group).unwrap(), 0);

    let mut left = shim.group_incl(world_group, &[0, 1]).unwrap();
    let mut right = shim.group_incl(world_group, &[1, 2]).unwrap();

    // World rank 0 is not in `right`; world rank 1 sits at its position 0.
    let translated = shim.group_translate_ranks(left, &[0, 1], right).unwrap();
    assert_eq!(translated, vec![UNDEFINED, 0]);

    // Rank 2 of a two-member group does not exist.
    assert!(shim.group_incl(left, &[2]).is_err());

    shim.group_free(&mut right).unwrap();
    shim.group_free(&mut left).unwrap();
    assert_eq!(left, GROUP_NULL);
    shim.group_free(&mut world_group).unwrap();
}

#[test]
fn test_group_incl_empty_short_circuits() {
    let mut shim = shim();
    let mut world_group = shim.comm_group(COMM_WORLD).unwrap();
    let native_calls_before = shim.runtime().live_groups();
    let empty = shim.group_incl(world_group, &[]).unwrap();
    assert_eq!(empty, GROUP_EMPTY);
    // No native group was created.
    assert_eq!(shim.runtime().live_groups(), native_calls_before);
    shim.group_free(&mut world_group).unwrap();
}

#[test]
fn test_group_free_on_empty_group_is_noop() {
    let mut shim = shim();
    let mut group = GROUP_EMPTY;
    shim.group_free(&mut group).unwrap();
    assert_eq!(group, GROUP_EMPTY);
}

#[test]
fn test_group_release_while_comm_still_references() {
    let mut shim = shim();
    let split = shim.comm_split(COMM_WORLD, 2, 0).unwrap();
    let group = shim.session().unwrap().comm_group_handle(split).unwrap();

    // The communicator holds the only reference; a user-level free of the
    // group handle without a direct reference is an underflow.
    let mut handle = group;
    assert_eq!(
        shim.group_free(&mut handle),
        Err(ShimError::RefCountUnderflow { group })
    );

    let mut comm = split;
    shim.comm_free(&mut comm).unwrap();
}
