// This module defines the NativeRuntime trait, the bridge between the shim
// and whatever message-passing runtime sits underneath. The trait exposes the
// runtime's opaque handle types as associated types with per-kind null
// constants, the implementation-varying numeric constants the translation
// tables are built from, accessors for the named status fields, and the set
// of forwarded operations the shim's entry points invoke after translating
// their arguments. A real binding forwards each method to the underlying
// library; the in-crate mock fakes just enough semantics to test the
// translation core without a transport.

//! The seam to the underlying message-passing runtime.
//!
//! Every forwarded operation returns the runtime's *native* error code;
//! translation into shim space happens in the forwarding layer. Output
//! arguments are plain `&mut` parameters, mirroring the underlying C-style
//! ABI, so a real binding is a thin veneer over the native calls.

pub mod mock;

/// Bridge between the shim and a concrete message-passing runtime.
///
/// # Status contract
///
/// `Status` must be plain old data: `Copy`, with every bit pattern valid
/// (no references, no niches). The status translator moves these records
/// through an opaque byte region, so this is load-bearing, not advisory.
pub trait NativeRuntime {
    type Comm: Copy + PartialEq + std::fmt::Debug;
    type Group: Copy + PartialEq + std::fmt::Debug;
    type Datatype: Copy + PartialEq + std::fmt::Debug;
    type Request: Copy + PartialEq + std::fmt::Debug;
    type Op: Copy + PartialEq + std::fmt::Debug;
    type Info: Copy + PartialEq + std::fmt::Debug;
    type File: Copy + PartialEq + std::fmt::Debug;
    type Errhandler: Copy + PartialEq + std::fmt::Debug;
    type Status: Copy + Default;

    const COMM_NULL: Self::Comm;
    const GROUP_NULL: Self::Group;
    const DATATYPE_NULL: Self::Datatype;
    const REQUEST_NULL: Self::Request;
    const OP_NULL: Self::Op;
    const INFO_NULL: Self::Info;
    const FILE_NULL: Self::File;
    const ERRHANDLER_NULL: Self::Errhandler;

    // ---- constant space -------------------------------------------------

    /// (shim, native) error-code pairs for every code the runtime defines.
    fn error_pairs(&self) -> Vec<(i32, i32)>;
    /// (native, shim) comparison-result pairs.
    fn comparison_pairs(&self) -> Vec<(i32, i32)>;
    /// (shim bit, native bit) file access-mode pairs.
    fn amode_pairs(&self) -> Vec<(i32, i32)>;
    /// Native code meaning "internal error".
    fn native_internal_error(&self) -> i32;
    /// Native code meaning success.
    fn native_success(&self) -> i32;
    /// Native "undefined" rank/index/count sentinel.
    fn undefined(&self) -> i32;
    fn any_source(&self) -> i32;
    fn any_tag(&self) -> i32;
    fn proc_null(&self) -> i32;

    // ---- predefined objects ---------------------------------------------

    fn world_comm(&self) -> Self::Comm;
    fn self_comm(&self) -> Self::Comm;
    fn empty_group(&self) -> Self::Group;
    /// (shim tag, native datatype) pairs for the built-in element types.
    fn builtin_datatypes(&self) -> Vec<(i32, Self::Datatype)>;
    /// (shim tag, native op) pairs for the predefined reductions.
    fn builtin_ops(&self) -> Vec<(i32, Self::Op)>;
    /// (shim tag, native handler) pairs for the predefined error handlers.
    fn builtin_errhandlers(&self) -> Vec<(i32, Self::Errhandler)>;

    // ---- status accessors -----------------------------------------------

    fn status_source(status: &Self::Status) -> i32;
    fn status_tag(status: &Self::Status) -> i32;
    fn status_error(status: &Self::Status) -> i32;

    // ---- environment ------------------------------------------------------

    fn init(&mut self) -> i32;
    fn finalize(&mut self) -> i32;
    fn initialized(&self, flag: &mut bool) -> i32;
    fn finalized(&self, flag: &mut bool) -> i32;

    // ---- communicators ----------------------------------------------------

    fn comm_size(&mut self, comm: Self::Comm, size: &mut i32) -> i32;
    fn comm_rank(&mut self, comm: Self::Comm, rank: &mut i32) -> i32;
    fn comm_dup(&mut self, comm: Self::Comm, out: &mut Self::Comm) -> i32;
    fn comm_split(&mut self, comm: Self::Comm, color: i32, key: i32, out: &mut Self::Comm) -> i32;
    fn comm_create(&mut self, comm: Self::Comm, group: Self::Group, out: &mut Self::Comm) -> i32;
    fn comm_compare(&mut self, a: Self::Comm, b: Self::Comm, result: &mut i32) -> i32;
    fn comm_group(&mut self, comm: Self::Comm, out: &mut Self::Group) -> i32;
    fn comm_test_inter(&mut self, comm: Self::Comm, flag: &mut bool) -> i32;
    fn comm_free(&mut self, comm: &mut Self::Comm) -> i32;

    // ---- groups -----------------------------------------------------------

    fn group_incl(&mut self, group: Self::Group, ranks: &[i32], out: &mut Self::Group) -> i32;
    fn group_excl(&mut self, group: Self::Group, ranks: &[i32], out: &mut Self::Group) -> i32;
    fn group_rank(&mut self, group: Self::Group, rank: &mut i32) -> i32;
    fn group_translate_ranks(
        &mut self,
        a: Self::Group,
        ranks_a: &[i32],
        b: Self::Group,
        ranks_b: &mut [i32],
    ) -> i32;
    fn group_free(&mut self, group: &mut Self::Group) -> i32;

    // ---- datatypes ----------------------------------------------------------

    fn type_contiguous(&mut self, count: i32, old: Self::Datatype, out: &mut Self::Datatype)
        -> i32;
    fn type_vector(
        &mut self,
        count: i32,
        blocklength: i32,
        stride: i32,
        old: Self::Datatype,
        out: &mut Self::Datatype,
    ) -> i32;
    fn type_indexed(
        &mut self,
        blocklengths: &[i32],
        displacements: &[i32],
        old: Self::Datatype,
        out: &mut Self::Datatype,
    ) -> i32;
    fn type_commit(&mut self, datatype: &mut Self::Datatype) -> i32;
    fn type_free(&mut self, datatype: &mut Self::Datatype) -> i32;
    fn type_size(&mut self, datatype: Self::Datatype, size: &mut i32) -> i32;

    // ---- reductions and info objects ---------------------------------------

    fn op_create(&mut self, commute: bool, out: &mut Self::Op) -> i32;
    fn op_free(&mut self, op: &mut Self::Op) -> i32;
    fn info_create(&mut self, out: &mut Self::Info) -> i32;
    fn info_dup(&mut self, info: Self::Info, out: &mut Self::Info) -> i32;
    fn info_free(&mut self, info: &mut Self::Info) -> i32;

    // ---- files --------------------------------------------------------------

    fn file_open(
        &mut self,
        comm: Self::Comm,
        filename: &str,
        amode: i32,
        info: Self::Info,
        out: &mut Self::File,
    ) -> i32;
    fn file_close(&mut self, file: &mut Self::File) -> i32;

    // ---- point-to-point -------------------------------------------------------

    fn send(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Self::Datatype,
        dest: i32,
        tag: i32,
        comm: Self::Comm,
    ) -> i32;
    fn ssend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Self::Datatype,
        dest: i32,
        tag: i32,
        comm: Self::Comm,
    ) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn recv(
        &mut self,
        buf: &mut [u8],
        count: i32,
        datatype: Self::Datatype,
        source: i32,
        tag: i32,
        comm: Self::Comm,
        status: Option<&mut Self::Status>,
    ) -> i32;
    fn probe(
        &mut self,
        source: i32,
        tag: i32,
        comm: Self::Comm,
        status: Option<&mut Self::Status>,
    ) -> i32;
    fn iprobe(
        &mut self,
        source: i32,
        tag: i32,
        comm: Self::Comm,
        flag: &mut bool,
        status: Option<&mut Self::Status>,
    ) -> i32;
    fn get_count(&mut self, status: &Self::Status, datatype: Self::Datatype, count: &mut i32)
        -> i32;

    // ---- non-blocking initiation -------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn isend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Self::Datatype,
        dest: i32,
        tag: i32,
        comm: Self::Comm,
        request: &mut Self::Request,
    ) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn issend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Self::Datatype,
        dest: i32,
        tag: i32,
        comm: Self::Comm,
        request: &mut Self::Request,
    ) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn irecv(
        &mut self,
        buf: &mut [u8],
        count: i32,
        datatype: Self::Datatype,
        source: i32,
        tag: i32,
        comm: Self::Comm,
        request: &mut Self::Request,
    ) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn send_init(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Self::Datatype,
        dest: i32,
        tag: i32,
        comm: Self::Comm,
        request: &mut Self::Request,
    ) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn recv_init(
        &mut self,
        buf: &mut [u8],
        count: i32,
        datatype: Self::Datatype,
        source: i32,
        tag: i32,
        comm: Self::Comm,
        request: &mut Self::Request,
    ) -> i32;
    fn start(&mut self, request: &mut Self::Request) -> i32;

    // ---- completion -----------------------------------------------------------

    fn wait(&mut self, request: &mut Self::Request, status: Option<&mut Self::Status>) -> i32;
    fn test(
        &mut self,
        request: &mut Self::Request,
        flag: &mut bool,
        status: Option<&mut Self::Status>,
    ) -> i32;
    fn waitall(
        &mut self,
        requests: &mut [Self::Request],
        statuses: Option<&mut [Self::Status]>,
    ) -> i32;
    fn waitany(
        &mut self,
        requests: &mut [Self::Request],
        index: &mut i32,
        status: Option<&mut Self::Status>,
    ) -> i32;
    fn waitsome(
        &mut self,
        requests: &mut [Self::Request],
        outcount: &mut i32,
        indices: &mut [i32],
        statuses: Option<&mut [Self::Status]>,
    ) -> i32;
    fn testall(
        &mut self,
        requests: &mut [Self::Request],
        flag: &mut bool,
        statuses: Option<&mut [Self::Status]>,
    ) -> i32;
    fn testany(
        &mut self,
        requests: &mut [Self::Request],
        index: &mut i32,
        flag: &mut bool,
        status: Option<&mut Self::Status>,
    ) -> i32;
    fn testsome(
        &mut self,
        requests: &mut [Self::Request],
        outcount: &mut i32,
        indices: &mut [i32],
        statuses: Option<&mut [Self::Status]>,
    ) -> i32;
    fn request_free(&mut self, request: &mut Self::Request) -> i32;
}
