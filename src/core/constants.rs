// This module pins down the shim's numeric ABI: the integer handle aliases for
// every object kind, the per-kind null handles and static (predefined) handle
// ranges, the error-code space, comparison results, datatype and reduction-op
// tags, and file access-mode bits. These values are the contract client
// binaries compile against; they never change across underlying runtime
// versions, which is the entire point of the shim.

//! The shim's stable numeric constant space.
//!
//! Handles are plain `i32` values. Zero is the null handle for every kind.
//! Each kind reserves a fixed initial range for predefined objects; dynamic
//! allocation starts at the kind's volatile offset.

/// Communicator handle.
pub type Comm = i32;
/// Process-group handle.
pub type Group = i32;
/// Datatype handle.
pub type Datatype = i32;
/// Request handle for non-blocking operations.
pub type Request = i32;
/// Reduction-operation handle.
pub type Op = i32;
/// Info-object handle.
pub type Info = i32;
/// File handle.
pub type File = i32;
/// Error-handler handle.
pub type Errhandler = i32;

/// Null handle shared by every object kind.
pub const NULL_HANDLE: i32 = 0;

pub const COMM_NULL: Comm = 0;
pub const COMM_WORLD: Comm = 1;
pub const COMM_SELF: Comm = 2;
/// First dynamically allocatable communicator handle.
pub const COMM_VOLATILE_OFFSET: usize = 3;

pub const GROUP_NULL: Group = 0;
pub const GROUP_EMPTY: Group = 1;
/// Group underneath [`COMM_WORLD`].
pub const GROUP_WORLD: Group = 2;
/// Group underneath [`COMM_SELF`].
pub const GROUP_SELF: Group = 3;
pub const GROUP_VOLATILE_OFFSET: usize = 4;

pub const REQUEST_NULL: Request = 0;
pub const REQUEST_VOLATILE_OFFSET: usize = 1;

pub const OP_NULL: Op = 0;
pub const OP_MAX: Op = 1;
pub const OP_MIN: Op = 2;
pub const OP_SUM: Op = 3;
pub const OP_PROD: Op = 4;
pub const OP_MAXLOC: Op = 5;
pub const OP_MINLOC: Op = 6;
pub const OP_BAND: Op = 7;
pub const OP_BOR: Op = 8;
pub const OP_BXOR: Op = 9;
pub const OP_LAND: Op = 10;
pub const OP_LOR: Op = 11;
pub const OP_LXOR: Op = 12;
pub const OP_VOLATILE_OFFSET: usize = 13;

pub const INFO_NULL: Info = 0;
pub const INFO_VOLATILE_OFFSET: usize = 1;

pub const FILE_NULL: File = 0;
pub const FILE_VOLATILE_OFFSET: usize = 1;

pub const ERRHANDLER_NULL: Errhandler = 0;
pub const ERRORS_ARE_FATAL: Errhandler = 1;
pub const ERRORS_RETURN: Errhandler = 2;
pub const ERRHANDLER_VOLATILE_OFFSET: usize = 3;

/* Elementary datatypes. */
pub const DATATYPE_NULL: Datatype = 0;
pub const TYPE_CHAR: Datatype = 1;
pub const TYPE_SHORT: Datatype = 2;
pub const TYPE_INT: Datatype = 3;
pub const TYPE_LONG: Datatype = 4;
pub const TYPE_UNSIGNED_CHAR: Datatype = 5;
pub const TYPE_UNSIGNED_SHORT: Datatype = 6;
pub const TYPE_UNSIGNED: Datatype = 7;
pub const TYPE_UNSIGNED_LONG: Datatype = 8;
pub const TYPE_FLOAT: Datatype = 9;
pub const TYPE_DOUBLE: Datatype = 10;
pub const TYPE_LONG_DOUBLE: Datatype = 11;
pub const TYPE_BYTE: Datatype = 12;
pub const TYPE_PACKED: Datatype = 13;

/* Pair datatypes for min/max-location reductions. */
pub const TYPE_FLOAT_INT: Datatype = 14;
pub const TYPE_DOUBLE_INT: Datatype = 15;
pub const TYPE_LONG_INT: Datatype = 16;
pub const TYPE_2INT: Datatype = 17;
pub const TYPE_SHORT_INT: Datatype = 18;
pub const TYPE_LONG_DOUBLE_INT: Datatype = 19;

/* Optional fixed-width and language-interop datatypes. */
pub const TYPE_LONG_LONG_INT: Datatype = 20;
pub const TYPE_INT32: Datatype = 21;
pub const TYPE_INT64: Datatype = 22;
pub const TYPE_COMPLEX: Datatype = 23;
pub const TYPE_DOUBLE_COMPLEX: Datatype = 24;
pub const TYPE_LOGICAL: Datatype = 25;
pub const TYPE_2REAL: Datatype = 26;
pub const TYPE_2DOUBLE_PRECISION: Datatype = 27;
pub const TYPE_2INTEGER: Datatype = 28;
pub const TYPE_INTEGER1: Datatype = 29;
pub const TYPE_INTEGER2: Datatype = 30;
pub const TYPE_INTEGER4: Datatype = 31;
pub const TYPE_INTEGER8: Datatype = 32;
pub const TYPE_REAL4: Datatype = 33;
pub const TYPE_REAL8: Datatype = 34;
pub const TYPE_UNSIGNED_LONG_LONG: Datatype = 35;

/* Bound markers for derived-datatype construction. */
pub const TYPE_LB: Datatype = 36;
pub const TYPE_UB: Datatype = 37;
pub const DATATYPE_VOLATILE_OFFSET: usize = 38;

/* Return codes. 0 is success by convention. */
pub const SUCCESS: i32 = 0;
pub const ERR_BUFFER: i32 = 1;
pub const ERR_COUNT: i32 = 2;
pub const ERR_TYPE: i32 = 3;
pub const ERR_TAG: i32 = 4;
pub const ERR_COMM: i32 = 5;
pub const ERR_RANK: i32 = 6;
pub const ERR_REQUEST: i32 = 7;
pub const ERR_ROOT: i32 = 8;
pub const ERR_GROUP: i32 = 9;
pub const ERR_OP: i32 = 10;
pub const ERR_TOPOLOGY: i32 = 11;
pub const ERR_DIMS: i32 = 12;
pub const ERR_ARG: i32 = 13;
pub const ERR_UNKNOWN: i32 = 14;
pub const ERR_TRUNCATE: i32 = 15;
pub const ERR_OTHER: i32 = 16;
pub const ERR_INTERN: i32 = 17;
pub const ERR_PENDING: i32 = 18;
pub const ERR_IN_STATUS: i32 = 19;
pub const ERR_FILE: i32 = 20;
pub const ERR_NOT_SAME: i32 = 21;
pub const ERR_AMODE: i32 = 22;
pub const ERR_UNSUPPORTED_DATAREP: i32 = 23;
pub const ERR_UNSUPPORTED_OPERATION: i32 = 24;
pub const ERR_NO_SUCH_FILE: i32 = 25;
pub const ERR_FILE_EXISTS: i32 = 26;
pub const ERR_BAD_FILE: i32 = 27;
pub const ERR_ACCESS: i32 = 28;
pub const ERR_NO_SPACE: i32 = 29;
pub const ERR_QUOTA: i32 = 30;
pub const ERR_READ_ONLY: i32 = 31;
pub const ERR_FILE_IN_USE: i32 = 32;
pub const ERR_DUP_DATAREP: i32 = 33;
pub const ERR_CONVERSION: i32 = 34;
pub const ERR_IO: i32 = 35;
pub const ERR_LASTCODE: i32 = 36;

/* Rank/tag sentinels. Negative so they never collide with valid ranks. */
pub const PROC_NULL: i32 = -2;
pub const ANY_SOURCE: i32 = -3;
/// Wildcard tag; must not overlap any valid tag.
pub const ANY_TAG: i32 = -4;
/// Undefined rank/index/count result.
pub const UNDEFINED: i32 = -5;

/* Results of communicator and group comparisons. */
pub const IDENT: i32 = 0;
pub const CONGRUENT: i32 = 1;
pub const SIMILAR: i32 = 2;
pub const UNEQUAL: i32 = 3;

/* File access modes. Combine with bitwise OR. */
pub const MODE_CREATE: i32 = 1;
pub const MODE_RDONLY: i32 = 2;
pub const MODE_WRONLY: i32 = 4;
pub const MODE_RDWR: i32 = 8;
pub const MODE_DELETE_ON_CLOSE: i32 = 16;
pub const MODE_UNIQUE_OPEN: i32 = 32;
pub const MODE_EXCL: i32 = 64;
pub const MODE_APPEND: i32 = 128;
pub const MODE_SEQUENTIAL: i32 = 256;

/// Capacity in bytes of the opaque region inside [`crate::core::status::Status`].
///
/// Must be at least as large as the native runtime's status record on every
/// supported runtime; checked once at session initialization.
pub const STATUS_OPAQUE_BYTES: usize = 48;

/// Object kinds with their own handle namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Comm,
    Group,
    Datatype,
    Request,
    Op,
    Info,
    File,
    Errhandler,
}

impl HandleKind {
    /// Error code reported when a handle of this kind is invalid.
    pub fn error_code(self) -> i32 {
        match self {
            HandleKind::Comm => ERR_COMM,
            HandleKind::Group => ERR_GROUP,
            HandleKind::Datatype => ERR_TYPE,
            HandleKind::Request => ERR_REQUEST,
            HandleKind::Op => ERR_OP,
            HandleKind::File => ERR_FILE,
            HandleKind::Info | HandleKind::Errhandler => ERR_ARG,
        }
    }
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandleKind::Comm => "communicator",
            HandleKind::Group => "group",
            HandleKind::Datatype => "datatype",
            HandleKind::Request => "request",
            HandleKind::Op => "op",
            HandleKind::Info => "info",
            HandleKind::File => "file",
            HandleKind::Errhandler => "errhandler",
        };
        f.write_str(name)
    }
}
