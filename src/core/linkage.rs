// This module keeps a communicator's underlying group alive exactly as long
// as needed. It owns the communicator and group handle pools plus an explicit
// ownership graph: every communicator record names its bound group handle,
// and every group record carries a reference count together with the list of
// communicator handles that own it, so the count can be audited against the
// owner list in tests. A group's native value is released only when its count
// reaches zero; predefined groups (empty/world/self) are counted like any
// other but never released.

//! Group / communicator linkage and reference counting.

use hashbrown::HashMap;
use log::{debug, trace};

use super::constants::{Comm, Group, HandleKind};
use super::error::{ShimError, ShimResult};
use super::pool::HandlePool;

/// Per-communicator linkage state.
#[derive(Debug, Clone)]
pub struct CommRecord {
    /// Handle of the group underneath this communicator.
    pub group: Group,
    /// Whether this is an intercommunicator.
    pub intercomm: bool,
}

/// Per-group linkage state.
///
/// Invariant: `refs` equals `owners.len()` plus one if a direct user
/// reference exists.
#[derive(Debug, Clone, Default)]
pub struct GroupRecord {
    pub refs: u32,
    pub owners: Vec<Comm>,
}

/// Native values that must be released after [`CommLinkage::free_comm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreedComm<C, G> {
    pub comm: C,
    /// Set when the communicator held the last reference to its group.
    pub group: Option<G>,
}

/// Communicator pool, group pool and the ownership graph between them.
#[derive(Debug)]
pub struct CommLinkage<C: Copy, G: Copy> {
    comms: HandlePool<C>,
    groups: HandlePool<G>,
    comm_records: HashMap<Comm, CommRecord>,
    group_records: HashMap<Group, GroupRecord>,
}

impl<C: Copy, G: Copy> CommLinkage<C, G> {
    pub fn new(
        comm_offset: usize,
        group_offset: usize,
        comm_capacity: usize,
        group_capacity: usize,
    ) -> Self {
        Self {
            comms: HandlePool::new(HandleKind::Comm, comm_offset, comm_capacity),
            groups: HandlePool::new(HandleKind::Group, group_offset, group_capacity),
            comm_records: HashMap::new(),
            group_records: HashMap::new(),
        }
    }

    /// Bind the null handles of both kinds to the native null values.
    pub fn register_null(&mut self, native_comm: C, native_group: G) {
        self.comms.register_static(0, native_comm);
        self.groups.register_static(0, native_group);
    }

    /// Register a predefined group (empty/world/self).
    pub fn register_static_group(&mut self, handle: Group, native: G) {
        self.groups.register_static(handle, native);
        self.group_records.insert(handle, GroupRecord::default());
    }

    /// Register a predefined communicator bound to an already-registered group.
    pub fn register_static_comm(&mut self, handle: Comm, native: C, group: Group, intercomm: bool) {
        self.comms.register_static(handle, native);
        self.comm_records
            .insert(handle, CommRecord { group, intercomm });
        let record = self
            .group_records
            .get_mut(&group)
            .expect("static communicator bound to unregistered group");
        record.refs += 1;
        record.owners.push(handle);
    }

    /// Native value of a communicator handle.
    pub fn comm_to_native(&self, handle: Comm) -> ShimResult<C> {
        self.comms.lookup(handle)
    }

    /// Native value of a group handle.
    pub fn group_to_native(&self, handle: Group) -> ShimResult<G> {
        self.groups.lookup(handle)
    }

    /// Linkage record of a live communicator.
    pub fn comm_record(&self, handle: Comm) -> ShimResult<&CommRecord> {
        self.comm_records.get(&handle).ok_or(ShimError::InvalidHandle {
            kind: HandleKind::Comm,
            handle,
        })
    }

    /// Current reference count of a group handle.
    pub fn group_refs(&self, handle: Group) -> ShimResult<u32> {
        self.group_record(handle).map(|r| r.refs)
    }

    /// Communicator handles currently owning a group.
    pub fn group_owners(&self, handle: Group) -> ShimResult<&[Comm]> {
        self.group_record(handle).map(|r| r.owners.as_slice())
    }

    /// Whether a group handle is in the predefined range.
    pub fn group_is_static(&self, handle: Group) -> bool {
        self.groups.is_static(handle)
    }

    /// Register a new communicator bound to an existing group handle.
    ///
    /// The group's reference count goes up by one.
    pub fn bind(&mut self, native_comm: C, group: Group, intercomm: bool) -> ShimResult<Comm> {
        if !self.groups.is_bound(group) {
            return Err(ShimError::InvalidHandle {
                kind: HandleKind::Group,
                handle: group,
            });
        }
        let comm = self.comms.allocate(native_comm);
        self.comm_records
            .insert(comm, CommRecord { group, intercomm });
        let record = self.group_records.entry(group).or_default();
        record.refs += 1;
        record.owners.push(comm);
        trace!("comm {comm} bound to group {group} (refs now {})", record.refs);
        Ok(comm)
    }

    /// Register a brand-new communicator together with its brand-new group.
    ///
    /// Used when one native call produces both (a split). The group handle is
    /// allocated without a direct user reference, so the net reference-count
    /// increment is exactly one.
    pub fn derive(
        &mut self,
        native_comm: C,
        native_group: G,
        intercomm: bool,
    ) -> ShimResult<(Comm, Group)> {
        let group = self.groups.allocate(native_group);
        self.group_records.insert(group, GroupRecord::default());
        let comm = self.bind(native_comm, group, intercomm)?;
        Ok((comm, group))
    }

    /// Hand out a group handle with one direct user reference.
    ///
    /// Used when the caller itself asked for the group (as opposed to a group
    /// created underneath a communicator).
    pub fn adopt_group(&mut self, native_group: G) -> Group {
        let group = self.groups.allocate(native_group);
        self.group_records.insert(
            group,
            GroupRecord {
                refs: 1,
                owners: Vec::new(),
            },
        );
        group
    }

    /// Drop the direct user reference on a group handle.
    ///
    /// Returns the native value when the count reached zero and the caller
    /// must release it. Predefined groups are a successful no-op.
    pub fn release_group(&mut self, handle: Group) -> ShimResult<Option<G>> {
        if self.groups.is_static(handle) {
            return Ok(None);
        }
        let record = self.group_records.get_mut(&handle).ok_or({
            ShimError::InvalidHandle {
                kind: HandleKind::Group,
                handle,
            }
        })?;
        if record.refs as usize <= record.owners.len() {
            // No direct reference outstanding; only communicators hold it.
            return Err(ShimError::RefCountUnderflow { group: handle });
        }
        record.refs -= 1;
        trace!("group {handle} released by user (refs now {})", record.refs);
        self.reap_group(handle)
    }

    /// Destroy a dynamic communicator and unbind it from its group.
    ///
    /// Handle-space bookkeeping commits here; the returned native values are
    /// the caller's to release. Predefined communicators are rejected.
    pub fn free_comm(&mut self, handle: Comm) -> ShimResult<FreedComm<C, G>> {
        if self.comms.is_static(handle) {
            return Err(ShimError::StaticHandle {
                kind: HandleKind::Comm,
                handle,
            });
        }
        let native_comm = self.comms.lookup(handle)?;
        let record = self.comm_records.get(&handle).ok_or(ShimError::InvalidHandle {
            kind: HandleKind::Comm,
            handle,
        })?;
        let group = record.group;

        let group_record =
            self.group_records
                .get_mut(&group)
                .ok_or(ShimError::RefCountUnderflow { group })?;
        if group_record.refs == 0 {
            return Err(ShimError::RefCountUnderflow { group });
        }
        group_record.refs -= 1;
        group_record.owners.retain(|&c| c != handle);
        trace!(
            "comm {handle} unbound from group {group} (refs now {})",
            group_record.refs
        );

        self.comm_records.remove(&handle);
        self.comms.release(handle)?;
        let freed_group = self.reap_group(group)?;
        Ok(FreedComm {
            comm: native_comm,
            group: freed_group,
        })
    }

    /// Diagnostics for teardown logging.
    pub fn live_counts(&self) -> (usize, usize) {
        (self.comms.in_use(), self.groups.in_use())
    }

    fn group_record(&self, handle: Group) -> ShimResult<&GroupRecord> {
        self.group_records.get(&handle).ok_or(ShimError::InvalidHandle {
            kind: HandleKind::Group,
            handle,
        })
    }

    /// Free a group's slot once its count hits zero (static groups excepted).
    fn reap_group(&mut self, handle: Group) -> ShimResult<Option<G>> {
        if self.groups.is_static(handle) {
            return Ok(None);
        }
        let Some(record) = self.group_records.get(&handle) else {
            return Ok(None);
        };
        if record.refs > 0 {
            return Ok(None);
        }
        debug_assert!(record.owners.is_empty());
        let native = self.groups.lookup(handle)?;
        self.groups.release(handle)?;
        self.group_records.remove(&handle);
        debug!("group {handle} reached zero references, slot freed");
        Ok(Some(native))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{COMM_SELF, COMM_WORLD, GROUP_EMPTY, GROUP_SELF, GROUP_WORLD};

    fn linkage() -> CommLinkage<u64, u64> {
        let mut l = CommLinkage::new(3, 4, 16, 16);
        l.register_null(0, 0);
        l.register_static_group(GROUP_EMPTY, 901);
        l.register_static_group(GROUP_WORLD, 902);
        l.register_static_group(GROUP_SELF, 903);
        l.register_static_comm(COMM_WORLD, 801, GROUP_WORLD, false);
        l.register_static_comm(COMM_SELF, 802, GROUP_SELF, false);
        l
    }

    #[test]
    fn test_derive_nets_exactly_one_reference() {
        let mut l = linkage();
        let (comm, group) = l.derive(10, 20, false).unwrap();
        assert_eq!(l.group_refs(group).unwrap(), 1);
        assert_eq!(l.group_owners(group).unwrap(), &[comm]);
        assert_eq!(l.comm_to_native(comm).unwrap(), 10);
        assert_eq!(l.group_to_native(group).unwrap(), 20);
    }

    #[test]
    fn test_shared_group_round_trip_conservation() {
        let mut l = linkage();
        let (original, group) = l.derive(10, 20, false).unwrap();
        // A duplicate communicator sharing the same group.
        let dup = l.bind(11, group, false).unwrap();
        assert_eq!(l.group_refs(group).unwrap(), 2);

        let freed = l.free_comm(dup).unwrap();
        assert_eq!(freed.comm, 11);
        assert_eq!(freed.group, None);
        assert_eq!(l.group_refs(group).unwrap(), 1);

        let freed = l.free_comm(original).unwrap();
        assert_eq!(freed.comm, 10);
        // Last reference gone: the native group is handed back for release.
        assert_eq!(freed.group, Some(20));
        assert!(l.group_to_native(group).is_err());
    }

    #[test]
    fn test_direct_reference_keeps_group_alive() {
        let mut l = linkage();
        let group = l.adopt_group(30);
        let comm = l.bind(12, group, false).unwrap();
        assert_eq!(l.group_refs(group).unwrap(), 2);

        let freed = l.free_comm(comm).unwrap();
        assert_eq!(freed.group, None);
        assert_eq!(l.group_refs(group).unwrap(), 1);

        assert_eq!(l.release_group(group).unwrap(), Some(30));
    }

    #[test]
    fn test_release_group_without_direct_reference_underflows() {
        let mut l = linkage();
        let (_, group) = l.derive(10, 20, false).unwrap();
        assert_eq!(
            l.release_group(group),
            Err(ShimError::RefCountUnderflow { group })
        );
    }

    #[test]
    fn test_free_static_comm_is_rejected() {
        let mut l = linkage();
        assert_eq!(
            l.free_comm(COMM_WORLD),
            Err(ShimError::StaticHandle {
                kind: HandleKind::Comm,
                handle: COMM_WORLD,
            })
        );
    }

    #[test]
    fn test_release_static_group_is_noop() {
        let mut l = linkage();
        assert_eq!(l.release_group(GROUP_EMPTY).unwrap(), None);
        assert_eq!(l.group_to_native(GROUP_EMPTY).unwrap(), 901);
    }

    #[test]
    fn test_static_group_survives_dup_and_free() {
        let mut l = linkage();
        let dup = l.bind(13, GROUP_WORLD, false).unwrap();
        assert_eq!(l.group_refs(GROUP_WORLD).unwrap(), 2);
        let freed = l.free_comm(dup).unwrap();
        // World group is predefined; never handed back for release.
        assert_eq!(freed.group, None);
        assert_eq!(l.group_refs(GROUP_WORLD).unwrap(), 1);
    }

    #[test]
    fn test_double_free_comm_is_invalid() {
        let mut l = linkage();
        let (comm, _) = l.derive(10, 20, false).unwrap();
        l.free_comm(comm).unwrap();
        assert!(matches!(
            l.free_comm(comm),
            Err(ShimError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_intercomm_flag_is_recorded() {
        let mut l = linkage();
        let (comm, _) = l.derive(10, 20, true).unwrap();
        assert!(l.comm_record(comm).unwrap().intercomm);
    }
}
