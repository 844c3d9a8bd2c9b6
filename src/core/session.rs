// This module provides the translation session, the single context object
// that owns every handle pool, the group/communicator linkage graph, the
// constant tables and the cached native sentinel values. Initialization runs
// in the order the rest of the crate depends on: status-capacity check,
// constant tables, pools with their static handles, then the predefined
// communicator/group bindings. A session cannot be observed in a partially
// initialized state; finalization is bulk teardown of the backing storage.

//! The translation session owning all pools and tables.

use log::debug;

use super::constants::{
    self, Comm, Datatype, Errhandler, File, Group, HandleKind, Info, Op,
    COMM_SELF, COMM_VOLATILE_OFFSET, COMM_WORLD, DATATYPE_VOLATILE_OFFSET,
    ERRHANDLER_VOLATILE_OFFSET, FILE_VOLATILE_OFFSET, GROUP_EMPTY, GROUP_SELF,
    GROUP_VOLATILE_OFFSET, GROUP_WORLD, INFO_VOLATILE_OFFSET, OP_VOLATILE_OFFSET,
};
use super::error::{ShimError, ShimResult};
use super::linkage::CommLinkage;
use super::pool::{HandlePool, DEFAULT_POOL_CAPACITY};
use super::requests::RequestTracker;
use super::status;
use super::tables::ConstantTables;
use crate::runtime::NativeRuntime;

/// Native sentinel values cached at initialization.
#[derive(Debug, Clone, Copy)]
struct NativeSentinels {
    success: i32,
    undefined: i32,
    any_source: i32,
    any_tag: i32,
    proc_null: i32,
}

/// Owns the complete translation state for one process.
///
/// All methods take `&self`/`&mut self`; callers provide external
/// synchronization if they share a session across threads (the underlying
/// runtime is assumed single-threaded anyway).
pub struct TranslationSession<R: NativeRuntime> {
    tables: ConstantTables,
    sentinels: NativeSentinels,
    pub(crate) linkage: CommLinkage<R::Comm, R::Group>,
    pub(crate) datatypes: HandlePool<R::Datatype>,
    pub(crate) requests: RequestTracker<R::Request>,
    pub(crate) ops: HandlePool<R::Op>,
    pub(crate) infos: HandlePool<R::Info>,
    pub(crate) files: HandlePool<R::File>,
    pub(crate) errhandlers: HandlePool<R::Errhandler>,
}

impl<R: NativeRuntime> TranslationSession<R> {
    /// Build a ready session against an initialized runtime.
    ///
    /// Fails with [`ShimError::StatusCapacity`] if the native status record
    /// does not fit the opaque region, and with the translated native error
    /// if fetching the predefined world/self groups fails.
    pub fn initialize(runtime: &mut R) -> ShimResult<Self> {
        status::check_capacity(std::mem::size_of::<R::Status>())?;

        let tables = ConstantTables::build(
            &runtime.error_pairs(),
            &runtime.comparison_pairs(),
            &runtime.amode_pairs(),
            runtime.native_internal_error(),
        );
        let sentinels = NativeSentinels {
            success: runtime.native_success(),
            undefined: runtime.undefined(),
            any_source: runtime.any_source(),
            any_tag: runtime.any_tag(),
            proc_null: runtime.proc_null(),
        };

        let mut linkage = CommLinkage::new(
            COMM_VOLATILE_OFFSET,
            GROUP_VOLATILE_OFFSET,
            DEFAULT_POOL_CAPACITY,
            DEFAULT_POOL_CAPACITY,
        );
        linkage.register_null(R::COMM_NULL, R::GROUP_NULL);
        linkage.register_static_group(GROUP_EMPTY, runtime.empty_group());

        let mut group_world = R::GROUP_NULL;
        let code = runtime.comm_group(runtime.world_comm(), &mut group_world);
        native_result_with(&tables, sentinels.success, code)?;
        linkage.register_static_group(GROUP_WORLD, group_world);

        let mut group_self = R::GROUP_NULL;
        let code = runtime.comm_group(runtime.self_comm(), &mut group_self);
        native_result_with(&tables, sentinels.success, code)?;
        linkage.register_static_group(GROUP_SELF, group_self);

        linkage.register_static_comm(COMM_WORLD, runtime.world_comm(), GROUP_WORLD, false);
        linkage.register_static_comm(COMM_SELF, runtime.self_comm(), GROUP_SELF, false);

        let mut datatypes = HandlePool::new(
            HandleKind::Datatype,
            DATATYPE_VOLATILE_OFFSET,
            DEFAULT_POOL_CAPACITY,
        );
        datatypes.register_static(constants::DATATYPE_NULL, R::DATATYPE_NULL);
        for (tag, native) in runtime.builtin_datatypes() {
            datatypes.register_static(tag, native);
        }

        let mut ops = HandlePool::new(HandleKind::Op, OP_VOLATILE_OFFSET, 20);
        ops.register_static(constants::OP_NULL, R::OP_NULL);
        for (tag, native) in runtime.builtin_ops() {
            ops.register_static(tag, native);
        }

        let mut errhandlers = HandlePool::new(
            HandleKind::Errhandler,
            ERRHANDLER_VOLATILE_OFFSET,
            DEFAULT_POOL_CAPACITY,
        );
        errhandlers.register_static(constants::ERRHANDLER_NULL, R::ERRHANDLER_NULL);
        for (tag, native) in runtime.builtin_errhandlers() {
            errhandlers.register_static(tag, native);
        }

        let mut infos =
            HandlePool::new(HandleKind::Info, INFO_VOLATILE_OFFSET, DEFAULT_POOL_CAPACITY);
        infos.register_static(constants::INFO_NULL, R::INFO_NULL);

        let mut files =
            HandlePool::new(HandleKind::File, FILE_VOLATILE_OFFSET, DEFAULT_POOL_CAPACITY);
        files.register_static(constants::FILE_NULL, R::FILE_NULL);

        debug!("translation session initialized");
        Ok(Self {
            tables,
            sentinels,
            linkage,
            datatypes,
            requests: RequestTracker::new(R::REQUEST_NULL),
            ops,
            infos,
            files,
            errhandlers,
        })
    }

    /// Turn a native return code into a result in shim space.
    pub fn native_result(&self, code: i32) -> ShimResult<()> {
        native_result_with(&self.tables, self.sentinels.success, code)
    }

    pub fn error_to_shim(&self, native: i32) -> i32 {
        self.tables.error_to_shim(native)
    }

    pub fn error_to_native(&self, shim: i32) -> i32 {
        self.tables.error_to_native(shim)
    }

    pub fn comparison_to_shim(&self, native: i32) -> i32 {
        self.tables.comparison_to_shim(native)
    }

    pub fn amode_to_native(&self, shim: i32) -> i32 {
        self.tables.amode_to_native(shim)
    }

    /// Translate a source/destination rank into native space.
    pub fn rank_to_native(&self, rank: i32) -> i32 {
        match rank {
            constants::ANY_SOURCE => self.sentinels.any_source,
            constants::PROC_NULL => self.sentinels.proc_null,
            other => other,
        }
    }

    /// Translate a message tag into native space.
    pub fn tag_to_native(&self, tag: i32) -> i32 {
        if tag == constants::ANY_TAG {
            self.sentinels.any_tag
        } else {
            tag
        }
    }

    /// Translate a split color into native space.
    pub fn color_to_native(&self, color: i32) -> i32 {
        if color == constants::UNDEFINED {
            self.sentinels.undefined
        } else {
            color
        }
    }

    /// Map the native undefined sentinel back into shim space.
    pub fn undefined_to_shim(&self, value: i32) -> i32 {
        if value == self.sentinels.undefined {
            constants::UNDEFINED
        } else {
            value
        }
    }

    /// Whether `value` is the native undefined sentinel.
    pub fn is_native_undefined(&self, value: i32) -> bool {
        value == self.sentinels.undefined
    }

    // Typed lookups, one per 1:1 kind; comm/group lookups live on the linkage.

    pub fn datatype(&self, handle: Datatype) -> ShimResult<R::Datatype> {
        self.datatypes.lookup(handle)
    }

    pub fn op(&self, handle: Op) -> ShimResult<R::Op> {
        self.ops.lookup(handle)
    }

    pub fn info(&self, handle: Info) -> ShimResult<R::Info> {
        self.infos.lookup(handle)
    }

    pub fn file(&self, handle: File) -> ShimResult<R::File> {
        self.files.lookup(handle)
    }

    pub fn errhandler(&self, handle: Errhandler) -> ShimResult<R::Errhandler> {
        self.errhandlers.lookup(handle)
    }

    pub fn comm(&self, handle: Comm) -> ShimResult<R::Comm> {
        self.linkage.comm_to_native(handle)
    }

    pub fn group(&self, handle: Group) -> ShimResult<R::Group> {
        self.linkage.group_to_native(handle)
    }

    /// Reference count of a group handle (test/diagnostic surface).
    pub fn group_refs(&self, handle: Group) -> ShimResult<u32> {
        self.linkage.group_refs(handle)
    }

    /// Group handle underneath a communicator.
    pub fn comm_group_handle(&self, handle: Comm) -> ShimResult<Group> {
        self.linkage.comm_record(handle).map(|r| r.group)
    }

    /// Log what is still live; called on finalize before the bulk teardown.
    pub fn log_teardown(&self) {
        let (comms, groups) = self.linkage.live_counts();
        debug!(
            "finalizing: {} comms, {} groups, {} datatypes, {} requests, {} ops still live",
            comms,
            groups,
            self.datatypes.in_use(),
            self.requests.outstanding(),
            self.ops.in_use(),
        );
    }
}

fn native_result_with(tables: &ConstantTables, success: i32, code: i32) -> ShimResult<()> {
    if code == success {
        Ok(())
    } else {
        Err(ShimError::NativeCall {
            code: tables.error_to_shim(code),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::MockRuntime;

    #[test]
    fn test_initialize_registers_static_handles() {
        let mut rt = MockRuntime::default();
        assert_eq!(rt.init(), rt.native_success());
        let session = TranslationSession::initialize(&mut rt).unwrap();

        assert_eq!(session.comm(COMM_WORLD).unwrap(), rt.world_comm());
        assert_eq!(session.comm(COMM_SELF).unwrap(), rt.self_comm());
        assert_eq!(session.group(GROUP_EMPTY).unwrap(), rt.empty_group());
        assert!(session.group(GROUP_WORLD).is_ok());
        assert!(session.group(GROUP_SELF).is_ok());
        assert!(session.datatype(constants::TYPE_INT).is_ok());
        assert!(session.op(constants::OP_SUM).is_ok());
        assert!(session.errhandler(constants::ERRORS_RETURN).is_ok());
    }

    #[test]
    fn test_predefined_comms_reference_their_groups() {
        let mut rt = MockRuntime::default();
        rt.init();
        let session = TranslationSession::initialize(&mut rt).unwrap();
        assert_eq!(session.comm_group_handle(COMM_WORLD).unwrap(), GROUP_WORLD);
        assert_eq!(session.group_refs(GROUP_WORLD).unwrap(), 1);
        assert_eq!(session.group_refs(GROUP_SELF).unwrap(), 1);
    }

    #[test]
    fn test_native_result_translates_failure() {
        let mut rt = MockRuntime::default();
        rt.init();
        let session = TranslationSession::initialize(&mut rt).unwrap();
        assert!(session.native_result(rt.native_success()).is_ok());
        let err = session.native_result(4242).unwrap_err();
        assert_eq!(
            err,
            ShimError::NativeCall {
                code: constants::ERR_INTERN
            }
        );
    }

    #[test]
    fn test_sentinel_translation() {
        let mut rt = MockRuntime::default();
        rt.init();
        let session = TranslationSession::initialize(&mut rt).unwrap();
        assert_eq!(session.rank_to_native(constants::ANY_SOURCE), rt.any_source());
        assert_eq!(session.rank_to_native(3), 3);
        assert_eq!(session.tag_to_native(constants::ANY_TAG), rt.any_tag());
        assert_eq!(session.undefined_to_shim(rt.undefined()), constants::UNDEFINED);
        assert_eq!(session.undefined_to_shim(7), 7);
    }
}
