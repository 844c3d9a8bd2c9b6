//! Object-management entry points: communicators, groups, datatypes,
//! reduction operations, info objects and files.
//!
//! Each call translates handles in, forwards to the native runtime, and
//! reflects created or destroyed objects in the pools before translating the
//! return code. Handle-space bookkeeping for destruction commits before the
//! native release call, so a freed handle is deterministically invalid even
//! when the native layer reports an error.

use crate::core::constants::{
    Comm, Datatype, File, Group, Info, Op, COMM_NULL, DATATYPE_NULL, FILE_NULL, GROUP_EMPTY,
    GROUP_NULL, INFO_NULL, OP_NULL,
};
use crate::core::error::{ShimError, ShimResult};
use crate::runtime::NativeRuntime;

use super::Shim;

impl<R: NativeRuntime> Shim<R> {
    // ---- communicators ----------------------------------------------------

    pub fn comm_size(&mut self, comm: Comm) -> ShimResult<i32> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let native = session.comm(comm)?;
        let mut size = 0;
        session.native_result(self.runtime.comm_size(native, &mut size))?;
        Ok(size)
    }

    pub fn comm_rank(&mut self, comm: Comm) -> ShimResult<i32> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let native = session.comm(comm)?;
        let mut rank = 0;
        session.native_result(self.runtime.comm_rank(native, &mut rank))?;
        Ok(rank)
    }

    /// Duplicate a communicator; the duplicate shares the source's group.
    pub fn comm_dup(&mut self, comm: Comm) -> ShimResult<Comm> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.comm(comm)?;
        let group = session.comm_group_handle(comm)?;
        let mut out = R::COMM_NULL;
        session.native_result(self.runtime.comm_dup(native, &mut out))?;
        let mut inter = false;
        session.native_result(self.runtime.comm_test_inter(out, &mut inter))?;
        session.linkage.bind(out, group, inter)
    }

    /// Split a communicator; an undefined color yields the null handle.
    ///
    /// The native call runs on every rank regardless of color, since a split
    /// is a global operation.
    pub fn comm_split(&mut self, comm: Comm, color: i32, key: i32) -> ShimResult<Comm> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.comm(comm)?;
        let native_color = session.color_to_native(color);
        let mut out = R::COMM_NULL;
        session.native_result(self.runtime.comm_split(native, native_color, key, &mut out))?;
        if out == R::COMM_NULL {
            return Ok(COMM_NULL);
        }
        self.adopt_derived_comm(out)
    }

    /// Create a communicator from a group; ranks outside the group get null.
    pub fn comm_create(&mut self, comm: Comm, group: Group) -> ShimResult<Comm> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.comm(comm)?;
        let native_group = session.group(group)?;
        let mut out = R::COMM_NULL;
        session.native_result(self.runtime.comm_create(native, native_group, &mut out))?;
        if out == R::COMM_NULL {
            return Ok(COMM_NULL);
        }
        self.adopt_derived_comm(out)
    }

    pub fn comm_compare(&mut self, a: Comm, b: Comm) -> ShimResult<i32> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let na = session.comm(a)?;
        let nb = session.comm(b)?;
        let mut result = 0;
        session.native_result(self.runtime.comm_compare(na, nb, &mut result))?;
        Ok(session.comparison_to_shim(result))
    }

    /// Hand out the group underneath a communicator.
    ///
    /// The caller receives a direct reference and must release it with
    /// [`Shim::group_free`].
    pub fn comm_group(&mut self, comm: Comm) -> ShimResult<Group> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.comm(comm)?;
        let mut out = R::GROUP_NULL;
        session.native_result(self.runtime.comm_group(native, &mut out))?;
        Ok(session.linkage.adopt_group(out))
    }

    /// Destroy a dynamic communicator, releasing its group if this was the
    /// last reference. Predefined communicators are rejected.
    pub fn comm_free(&mut self, comm: &mut Comm) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let freed = session.linkage.free_comm(*comm)?;
        let mut native = freed.comm;
        let comm_result = session.native_result(self.runtime.comm_free(&mut native));
        let group_result = match freed.group {
            Some(mut native_group) => {
                session.native_result(self.runtime.group_free(&mut native_group))
            }
            None => Ok(()),
        };
        *comm = COMM_NULL;
        comm_result.and(group_result)
    }

    /// Register a freshly created native communicator along with its group.
    fn adopt_derived_comm(&mut self, out: R::Comm) -> ShimResult<Comm> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut group = R::GROUP_NULL;
        session.native_result(self.runtime.comm_group(out, &mut group))?;
        let mut inter = false;
        session.native_result(self.runtime.comm_test_inter(out, &mut inter))?;
        let (comm, _) = session.linkage.derive(out, group, inter)?;
        Ok(comm)
    }

    // ---- groups -----------------------------------------------------------

    /// Subset a group by rank list. Zero ranks short-circuits to the empty
    /// group without a native call.
    pub fn group_incl(&mut self, group: Group, ranks: &[i32]) -> ShimResult<Group> {
        if ranks.is_empty() {
            return Ok(GROUP_EMPTY);
        }
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.group(group)?;
        let mut out = R::GROUP_NULL;
        session.native_result(self.runtime.group_incl(native, ranks, &mut out))?;
        Ok(session.linkage.adopt_group(out))
    }

    pub fn group_excl(&mut self, group: Group, ranks: &[i32]) -> ShimResult<Group> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.group(group)?;
        let mut out = R::GROUP_NULL;
        session.native_result(self.runtime.group_excl(native, ranks, &mut out))?;
        Ok(session.linkage.adopt_group(out))
    }

    /// Calling rank within the group, or `UNDEFINED` if not a member.
    pub fn group_rank(&mut self, group: Group) -> ShimResult<i32> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let native = session.group(group)?;
        let mut rank = 0;
        session.native_result(self.runtime.group_rank(native, &mut rank))?;
        Ok(session.undefined_to_shim(rank))
    }

    /// Translate ranks of `a` into ranks of `b`; unmapped ranks come back as
    /// `UNDEFINED`.
    pub fn group_translate_ranks(
        &mut self,
        a: Group,
        ranks: &[i32],
        b: Group,
    ) -> ShimResult<Vec<i32>> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let na = session.group(a)?;
        let nb = session.group(b)?;
        let mut out = vec![0; ranks.len()];
        session.native_result(self.runtime.group_translate_ranks(na, ranks, nb, &mut out))?;
        for rank in &mut out {
            *rank = session.undefined_to_shim(*rank);
        }
        Ok(out)
    }

    /// Release the caller's direct reference on a group.
    ///
    /// The empty and other predefined groups are a successful no-op, handle
    /// untouched; a dynamic group's handle is nulled, and its native value is
    /// freed once no communicator references remain.
    pub fn group_free(&mut self, group: &mut Group) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        if session.linkage.group_is_static(*group) {
            return Ok(());
        }
        let result = match session.linkage.release_group(*group)? {
            Some(mut native) => session.native_result(self.runtime.group_free(&mut native)),
            None => Ok(()),
        };
        *group = GROUP_NULL;
        result
    }

    // ---- datatypes ----------------------------------------------------------

    pub fn type_contiguous(&mut self, count: i32, oldtype: Datatype) -> ShimResult<Datatype> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let old = session.datatype(oldtype)?;
        let mut out = R::DATATYPE_NULL;
        session.native_result(self.runtime.type_contiguous(count, old, &mut out))?;
        Ok(session.datatypes.allocate(out))
    }

    pub fn type_vector(
        &mut self,
        count: i32,
        blocklength: i32,
        stride: i32,
        oldtype: Datatype,
    ) -> ShimResult<Datatype> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let old = session.datatype(oldtype)?;
        let mut out = R::DATATYPE_NULL;
        session.native_result(
            self.runtime
                .type_vector(count, blocklength, stride, old, &mut out),
        )?;
        Ok(session.datatypes.allocate(out))
    }

    pub fn type_indexed(
        &mut self,
        blocklengths: &[i32],
        displacements: &[i32],
        oldtype: Datatype,
    ) -> ShimResult<Datatype> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let old = session.datatype(oldtype)?;
        let mut out = R::DATATYPE_NULL;
        session.native_result(
            self.runtime
                .type_indexed(blocklengths, displacements, old, &mut out),
        )?;
        Ok(session.datatypes.allocate(out))
    }

    pub fn type_commit(&mut self, datatype: Datatype) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.datatype(datatype)?;
        let code = self.runtime.type_commit(&mut native);
        session.datatypes.update(datatype, native)?;
        session.native_result(code)
    }

    /// Destroy a user-derived datatype. Built-in types are rejected.
    pub fn type_free(&mut self, datatype: &mut Datatype) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        session.datatypes.ensure_volatile(*datatype)?;
        let mut native = session.datatype(*datatype)?;
        session.datatypes.release(*datatype)?;
        let result = session.native_result(self.runtime.type_free(&mut native));
        *datatype = DATATYPE_NULL;
        result
    }

    pub fn type_size(&mut self, datatype: Datatype) -> ShimResult<i32> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let native = session.datatype(datatype)?;
        let mut size = 0;
        session.native_result(self.runtime.type_size(native, &mut size))?;
        Ok(size)
    }

    // ---- reduction operations ----------------------------------------------

    pub fn op_create(&mut self, commute: bool) -> ShimResult<Op> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut out = R::OP_NULL;
        session.native_result(self.runtime.op_create(commute, &mut out))?;
        Ok(session.ops.allocate(out))
    }

    /// Destroy a user-created reduction. Predefined reductions are rejected.
    pub fn op_free(&mut self, op: &mut Op) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        session.ops.ensure_volatile(*op)?;
        let mut native = session.op(*op)?;
        session.ops.release(*op)?;
        let result = session.native_result(self.runtime.op_free(&mut native));
        *op = OP_NULL;
        result
    }

    // ---- info objects ---------------------------------------------------------

    pub fn info_create(&mut self) -> ShimResult<Info> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut out = R::INFO_NULL;
        session.native_result(self.runtime.info_create(&mut out))?;
        Ok(session.infos.allocate(out))
    }

    pub fn info_dup(&mut self, info: Info) -> ShimResult<Info> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native = session.info(info)?;
        let mut out = R::INFO_NULL;
        session.native_result(self.runtime.info_dup(native, &mut out))?;
        Ok(session.infos.allocate(out))
    }

    pub fn info_free(&mut self, info: &mut Info) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.info(*info)?;
        session.infos.release(*info)?;
        let result = session.native_result(self.runtime.info_free(&mut native));
        *info = INFO_NULL;
        result
    }

    // ---- files ------------------------------------------------------------------

    /// Open a file; the access mode is translated bit by bit.
    pub fn file_open(
        &mut self,
        comm: Comm,
        filename: &str,
        amode: i32,
        info: Info,
    ) -> ShimResult<File> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let native_comm = session.comm(comm)?;
        let native_info = session.info(info)?;
        let native_amode = session.amode_to_native(amode);
        let mut out = R::FILE_NULL;
        session.native_result(self.runtime.file_open(
            native_comm,
            filename,
            native_amode,
            native_info,
            &mut out,
        ))?;
        Ok(session.files.allocate(out))
    }

    pub fn file_close(&mut self, file: &mut File) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.file(*file)?;
        session.files.release(*file)?;
        let result = session.native_result(self.runtime.file_close(&mut native));
        *file = FILE_NULL;
        result
    }
}
