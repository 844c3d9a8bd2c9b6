// This module implements MockRuntime, an in-crate NativeRuntime used by the
// test suite. It hands out opaque-looking handle values from a private id
// space, tracks which objects are live so leaks and double frees surface as
// test failures, synthesizes status records whose hidden stamp field proves
// the opaque byte region round-trips, and uses deliberately skewed native
// constants (error codes, comparison results, sentinels, mode bits) so any
// missing translation shows up immediately. Request completion is scripted:
// tests mark requests ready by creation order to exercise the partial
// completion paths of the wait/test family.

//! Mock message-passing runtime for testing the translation core.

use hashbrown::{HashMap, HashSet};

use super::NativeRuntime;
use crate::core::constants;

/// Native error code the mock reports for shim code `shim`.
pub fn native_error(shim: i32) -> i32 {
    7000 + shim * 3
}

const NATIVE_UNDEFINED: i32 = -32766;
const NATIVE_ANY_SOURCE: i32 = -1001;
const NATIVE_ANY_TAG: i32 = -1002;
const NATIVE_PROC_NULL: i32 = -1003;

const WORLD_ID: u64 = 1;
const SELF_ID: u64 = 2;
const EMPTY_GROUP_ID: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockComm(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockGroup(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockDatatype(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockRequest(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockOp(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockInfo(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockFile(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockErrhandler(pub u64);

/// Mock status record.
///
/// `stamp` stands in for the implementation-internal state a real status
/// carries; it only survives translation if the opaque region is preserved
/// byte-for-byte.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MockStatus {
    pub source: i32,
    pub tag: i32,
    pub error: i32,
    pub stamp: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingOp {
    source: i32,
    tag: i32,
    /// Payload size recorded for later count queries.
    bytes: i32,
    persistent: bool,
    active: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct CommInfo {
    parent: Option<u64>,
    inter: bool,
}

/// Scriptable fake of the underlying message-passing library.
#[derive(Debug)]
pub struct MockRuntime {
    rank: i32,
    size: i32,
    initialized: bool,
    finalized: bool,
    next_id: u64,
    comms: HashMap<u64, CommInfo>,
    /// Group id -> members as world ranks.
    groups: HashMap<u64, Vec<i32>>,
    /// Datatype id -> element size in bytes.
    datatypes: HashMap<u64, i32>,
    requests: HashMap<u64, PendingOp>,
    /// Requests in creation order, for scripting.
    created: Vec<u64>,
    /// Requests allowed to complete in test/testsome-style calls.
    ready: HashSet<u64>,
    ops: HashSet<u64>,
    infos: HashSet<u64>,
    files: HashSet<u64>,
    /// Filename and translated access mode of the last file_open.
    last_open: Option<(String, i32)>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::with_topology(0, 4)
    }

    /// A mock process with the given rank in a world of `size` ranks.
    pub fn with_topology(rank: i32, size: i32) -> Self {
        Self {
            rank,
            size,
            initialized: false,
            finalized: false,
            next_id: 10,
            comms: HashMap::new(),
            groups: HashMap::new(),
            datatypes: HashMap::new(),
            requests: HashMap::new(),
            created: Vec::new(),
            ready: HashSet::new(),
            ops: HashSet::new(),
            infos: HashSet::new(),
            files: HashSet::new(),
            last_open: None,
        }
    }

    /// Allow the `n`th-created request (0-based) to complete in test calls.
    pub fn mark_ready(&mut self, n: usize) {
        let id = self.created[n];
        self.ready.insert(id);
    }

    pub fn live_comms(&self) -> usize {
        self.comms.len()
    }

    pub fn live_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn live_datatypes(&self) -> usize {
        self.datatypes.len()
    }

    pub fn live_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn last_open(&self) -> Option<&(String, i32)> {
        self.last_open.as_ref()
    }

    fn fresh(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn ok(&self) -> i32 {
        native_error(constants::SUCCESS)
    }

    fn fail(&self, shim: i32) -> i32 {
        native_error(shim)
    }

    fn type_bytes(&self, datatype: MockDatatype) -> Option<i32> {
        self.datatypes.get(&datatype.0).copied()
    }

    fn resolve_rank(&self, rank: i32) -> i32 {
        if rank == NATIVE_ANY_SOURCE {
            0
        } else {
            rank
        }
    }

    fn resolve_tag(&self, tag: i32) -> i32 {
        if tag == NATIVE_ANY_TAG {
            77
        } else {
            tag
        }
    }

    fn post_request(&mut self, source: i32, tag: i32, bytes: i32, persistent: bool) -> MockRequest {
        let id = self.fresh();
        self.requests.insert(
            id,
            PendingOp {
                source: self.resolve_rank(source),
                tag: self.resolve_tag(tag),
                bytes,
                persistent,
                active: !persistent,
            },
        );
        self.created.push(id);
        MockRequest(id)
    }

    /// Finish one request: fill the status and null or deactivate it.
    fn finish(
        &mut self,
        request: &mut MockRequest,
        status: Option<&mut MockStatus>,
    ) {
        let id = request.0;
        let pending = self.requests[&id];
        if let Some(status) = status {
            *status = MockStatus {
                source: pending.source,
                tag: pending.tag,
                error: self.ok(),
                stamp: pending.bytes as u32,
            };
        }
        self.ready.remove(&id);
        if pending.persistent {
            self.requests.get_mut(&id).unwrap().active = false;
        } else {
            self.requests.remove(&id);
            *request = Self::REQUEST_NULL;
        }
    }

    fn is_live_request(&self, request: MockRequest) -> bool {
        request != Self::REQUEST_NULL && self.requests.contains_key(&request.0)
    }

    fn payload_bytes(&self, count: i32, datatype: MockDatatype) -> Option<i32> {
        self.type_bytes(datatype).map(|b| b * count)
    }
}

impl NativeRuntime for MockRuntime {
    type Comm = MockComm;
    type Group = MockGroup;
    type Datatype = MockDatatype;
    type Request = MockRequest;
    type Op = MockOp;
    type Info = MockInfo;
    type File = MockFile;
    type Errhandler = MockErrhandler;
    type Status = MockStatus;

    const COMM_NULL: MockComm = MockComm(0);
    const GROUP_NULL: MockGroup = MockGroup(0);
    const DATATYPE_NULL: MockDatatype = MockDatatype(0);
    const REQUEST_NULL: MockRequest = MockRequest(0);
    const OP_NULL: MockOp = MockOp(0);
    const INFO_NULL: MockInfo = MockInfo(0);
    const FILE_NULL: MockFile = MockFile(0);
    const ERRHANDLER_NULL: MockErrhandler = MockErrhandler(0);

    fn error_pairs(&self) -> Vec<(i32, i32)> {
        (constants::SUCCESS..=constants::ERR_LASTCODE)
            .map(|shim| (shim, native_error(shim)))
            .collect()
    }

    fn comparison_pairs(&self) -> Vec<(i32, i32)> {
        vec![
            (111, constants::IDENT),
            (222, constants::CONGRUENT),
            (333, constants::SIMILAR),
            (444, constants::UNEQUAL),
        ]
    }

    fn amode_pairs(&self) -> Vec<(i32, i32)> {
        vec![
            (constants::MODE_CREATE, 0x0100),
            (constants::MODE_RDONLY, 0x0200),
            (constants::MODE_WRONLY, 0x0400),
            (constants::MODE_RDWR, 0x0800),
            (constants::MODE_DELETE_ON_CLOSE, 0x1000),
            (constants::MODE_UNIQUE_OPEN, 0x2000),
            (constants::MODE_EXCL, 0x4000),
            (constants::MODE_APPEND, 0x8000),
            (constants::MODE_SEQUENTIAL, 0x10000),
        ]
    }

    fn native_internal_error(&self) -> i32 {
        native_error(constants::ERR_INTERN)
    }

    fn native_success(&self) -> i32 {
        native_error(constants::SUCCESS)
    }

    fn undefined(&self) -> i32 {
        NATIVE_UNDEFINED
    }

    fn any_source(&self) -> i32 {
        NATIVE_ANY_SOURCE
    }

    fn any_tag(&self) -> i32 {
        NATIVE_ANY_TAG
    }

    fn proc_null(&self) -> i32 {
        NATIVE_PROC_NULL
    }

    fn world_comm(&self) -> MockComm {
        MockComm(WORLD_ID)
    }

    fn self_comm(&self) -> MockComm {
        MockComm(SELF_ID)
    }

    fn empty_group(&self) -> MockGroup {
        MockGroup(EMPTY_GROUP_ID)
    }

    fn builtin_datatypes(&self) -> Vec<(i32, MockDatatype)> {
        (constants::TYPE_CHAR..=constants::TYPE_UB)
            .map(|tag| (tag, MockDatatype(500 + tag as u64)))
            .collect()
    }

    fn builtin_ops(&self) -> Vec<(i32, MockOp)> {
        (constants::OP_MAX..=constants::OP_LXOR)
            .map(|tag| (tag, MockOp(600 + tag as u64)))
            .collect()
    }

    fn builtin_errhandlers(&self) -> Vec<(i32, MockErrhandler)> {
        vec![
            (constants::ERRORS_ARE_FATAL, MockErrhandler(701)),
            (constants::ERRORS_RETURN, MockErrhandler(702)),
        ]
    }

    fn status_source(status: &MockStatus) -> i32 {
        status.source
    }

    fn status_tag(status: &MockStatus) -> i32 {
        status.tag
    }

    fn status_error(status: &MockStatus) -> i32 {
        status.error
    }

    fn init(&mut self) -> i32 {
        self.initialized = true;
        self.comms.insert(WORLD_ID, CommInfo::default());
        self.comms.insert(SELF_ID, CommInfo::default());
        self.groups.insert(EMPTY_GROUP_ID, Vec::new());
        for (tag, native) in self.builtin_datatypes() {
            let bytes = builtin_type_bytes(tag);
            self.datatypes.insert(native.0, bytes);
        }
        self.ok()
    }

    fn finalize(&mut self) -> i32 {
        self.finalized = true;
        self.ok()
    }

    fn initialized(&self, flag: &mut bool) -> i32 {
        *flag = self.initialized;
        self.ok()
    }

    fn finalized(&self, flag: &mut bool) -> i32 {
        *flag = self.finalized;
        self.ok()
    }

    fn comm_size(&mut self, comm: MockComm, size: &mut i32) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        *size = if comm.0 == SELF_ID { 1 } else { self.size };
        self.ok()
    }

    fn comm_rank(&mut self, comm: MockComm, rank: &mut i32) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        *rank = if comm.0 == SELF_ID { 0 } else { self.rank };
        self.ok()
    }

    fn comm_dup(&mut self, comm: MockComm, out: &mut MockComm) -> i32 {
        let Some(&info) = self.comms.get(&comm.0) else {
            return self.fail(constants::ERR_COMM);
        };
        let id = self.fresh();
        self.comms.insert(
            id,
            CommInfo {
                parent: Some(comm.0),
                inter: info.inter,
            },
        );
        *out = MockComm(id);
        self.ok()
    }

    fn comm_split(&mut self, comm: MockComm, color: i32, _key: i32, out: &mut MockComm) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        if color == NATIVE_UNDEFINED {
            *out = Self::COMM_NULL;
            return self.ok();
        }
        let id = self.fresh();
        self.comms.insert(id, CommInfo::default());
        *out = MockComm(id);
        self.ok()
    }

    fn comm_create(&mut self, comm: MockComm, group: MockGroup, out: &mut MockComm) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let Some(members) = self.groups.get(&group.0) else {
            return self.fail(constants::ERR_GROUP);
        };
        if members.is_empty() {
            *out = Self::COMM_NULL;
            return self.ok();
        }
        let id = self.fresh();
        self.comms.insert(id, CommInfo::default());
        *out = MockComm(id);
        self.ok()
    }

    fn comm_compare(&mut self, a: MockComm, b: MockComm, result: &mut i32) -> i32 {
        let (Some(&ia), Some(&ib)) = (self.comms.get(&a.0), self.comms.get(&b.0)) else {
            return self.fail(constants::ERR_COMM);
        };
        *result = if a == b {
            111
        } else if ia.parent == Some(b.0) || ib.parent == Some(a.0) {
            222
        } else {
            444
        };
        self.ok()
    }

    fn comm_group(&mut self, comm: MockComm, out: &mut MockGroup) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let members: Vec<i32> = if comm.0 == SELF_ID {
            vec![self.rank]
        } else {
            (0..self.size).collect()
        };
        let id = self.fresh();
        self.groups.insert(id, members);
        *out = MockGroup(id);
        self.ok()
    }

    fn comm_test_inter(&mut self, comm: MockComm, flag: &mut bool) -> i32 {
        let Some(&info) = self.comms.get(&comm.0) else {
            return self.fail(constants::ERR_COMM);
        };
        *flag = info.inter;
        self.ok()
    }

    fn comm_free(&mut self, comm: &mut MockComm) -> i32 {
        if self.comms.remove(&comm.0).is_none() {
            return self.fail(constants::ERR_COMM);
        }
        *comm = Self::COMM_NULL;
        self.ok()
    }

    fn group_incl(&mut self, group: MockGroup, ranks: &[i32], out: &mut MockGroup) -> i32 {
        let Some(members) = self.groups.get(&group.0) else {
            return self.fail(constants::ERR_GROUP);
        };
        let mut selected = Vec::with_capacity(ranks.len());
        for &r in ranks {
            match members.get(r as usize) {
                Some(&world) => selected.push(world),
                None => return self.fail(constants::ERR_RANK),
            }
        }
        let id = self.fresh();
        self.groups.insert(id, selected);
        *out = MockGroup(id);
        self.ok()
    }

    fn group_excl(&mut self, group: MockGroup, ranks: &[i32], out: &mut MockGroup) -> i32 {
        let Some(members) = self.groups.get(&group.0) else {
            return self.fail(constants::ERR_GROUP);
        };
        let excluded: HashSet<usize> = ranks.iter().map(|&r| r as usize).collect();
        let remaining: Vec<i32> = members
            .iter()
            .enumerate()
            .filter(|(i, _)| !excluded.contains(i))
            .map(|(_, &w)| w)
            .collect();
        let id = self.fresh();
        self.groups.insert(id, remaining);
        *out = MockGroup(id);
        self.ok()
    }

    fn group_rank(&mut self, group: MockGroup, rank: &mut i32) -> i32 {
        let Some(members) = self.groups.get(&group.0) else {
            return self.fail(constants::ERR_GROUP);
        };
        *rank = members
            .iter()
            .position(|&w| w == self.rank)
            .map(|p| p as i32)
            .unwrap_or(NATIVE_UNDEFINED);
        self.ok()
    }

    fn group_translate_ranks(
        &mut self,
        a: MockGroup,
        ranks_a: &[i32],
        b: MockGroup,
        ranks_b: &mut [i32],
    ) -> i32 {
        let (Some(ma), Some(mb)) = (self.groups.get(&a.0), self.groups.get(&b.0)) else {
            return self.fail(constants::ERR_GROUP);
        };
        for (out, &r) in ranks_b.iter_mut().zip(ranks_a) {
            let Some(&world) = ma.get(r as usize) else {
                return self.fail(constants::ERR_RANK);
            };
            *out = mb
                .iter()
                .position(|&w| w == world)
                .map(|p| p as i32)
                .unwrap_or(NATIVE_UNDEFINED);
        }
        self.ok()
    }

    fn group_free(&mut self, group: &mut MockGroup) -> i32 {
        if self.groups.remove(&group.0).is_none() {
            return self.fail(constants::ERR_GROUP);
        }
        *group = Self::GROUP_NULL;
        self.ok()
    }

    fn type_contiguous(&mut self, count: i32, old: MockDatatype, out: &mut MockDatatype) -> i32 {
        let Some(bytes) = self.type_bytes(old) else {
            return self.fail(constants::ERR_TYPE);
        };
        let id = self.fresh();
        self.datatypes.insert(id, bytes * count);
        *out = MockDatatype(id);
        self.ok()
    }

    fn type_vector(
        &mut self,
        count: i32,
        blocklength: i32,
        _stride: i32,
        old: MockDatatype,
        out: &mut MockDatatype,
    ) -> i32 {
        let Some(bytes) = self.type_bytes(old) else {
            return self.fail(constants::ERR_TYPE);
        };
        let id = self.fresh();
        self.datatypes.insert(id, bytes * count * blocklength);
        *out = MockDatatype(id);
        self.ok()
    }

    fn type_indexed(
        &mut self,
        blocklengths: &[i32],
        displacements: &[i32],
        old: MockDatatype,
        out: &mut MockDatatype,
    ) -> i32 {
        if blocklengths.len() != displacements.len() {
            return self.fail(constants::ERR_ARG);
        }
        let Some(bytes) = self.type_bytes(old) else {
            return self.fail(constants::ERR_TYPE);
        };
        let total: i32 = blocklengths.iter().sum();
        let id = self.fresh();
        self.datatypes.insert(id, bytes * total);
        *out = MockDatatype(id);
        self.ok()
    }

    fn type_commit(&mut self, datatype: &mut MockDatatype) -> i32 {
        if !self.datatypes.contains_key(&datatype.0) {
            return self.fail(constants::ERR_TYPE);
        }
        self.ok()
    }

    fn type_free(&mut self, datatype: &mut MockDatatype) -> i32 {
        if self.datatypes.remove(&datatype.0).is_none() {
            return self.fail(constants::ERR_TYPE);
        }
        *datatype = Self::DATATYPE_NULL;
        self.ok()
    }

    fn type_size(&mut self, datatype: MockDatatype, size: &mut i32) -> i32 {
        match self.type_bytes(datatype) {
            Some(bytes) => {
                *size = bytes;
                self.ok()
            }
            None => self.fail(constants::ERR_TYPE),
        }
    }

    fn op_create(&mut self, _commute: bool, out: &mut MockOp) -> i32 {
        let id = self.fresh();
        self.ops.insert(id);
        *out = MockOp(id);
        self.ok()
    }

    fn op_free(&mut self, op: &mut MockOp) -> i32 {
        if !self.ops.remove(&op.0) {
            return self.fail(constants::ERR_OP);
        }
        *op = Self::OP_NULL;
        self.ok()
    }

    fn info_create(&mut self, out: &mut MockInfo) -> i32 {
        let id = self.fresh();
        self.infos.insert(id);
        *out = MockInfo(id);
        self.ok()
    }

    fn info_dup(&mut self, info: MockInfo, out: &mut MockInfo) -> i32 {
        if !self.infos.contains(&info.0) {
            return self.fail(constants::ERR_ARG);
        }
        let id = self.fresh();
        self.infos.insert(id);
        *out = MockInfo(id);
        self.ok()
    }

    fn info_free(&mut self, info: &mut MockInfo) -> i32 {
        if !self.infos.remove(&info.0) {
            return self.fail(constants::ERR_ARG);
        }
        *info = Self::INFO_NULL;
        self.ok()
    }

    fn file_open(
        &mut self,
        comm: MockComm,
        filename: &str,
        amode: i32,
        _info: MockInfo,
        out: &mut MockFile,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        self.last_open = Some((filename.to_string(), amode));
        let id = self.fresh();
        self.files.insert(id);
        *out = MockFile(id);
        self.ok()
    }

    fn file_close(&mut self, file: &mut MockFile) -> i32 {
        if !self.files.remove(&file.0) {
            return self.fail(constants::ERR_FILE);
        }
        *file = Self::FILE_NULL;
        self.ok()
    }

    fn send(
        &mut self,
        _buf: &[u8],
        _count: i32,
        datatype: MockDatatype,
        dest: i32,
        _tag: i32,
        comm: MockComm,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        if !self.datatypes.contains_key(&datatype.0) {
            return self.fail(constants::ERR_TYPE);
        }
        if dest != NATIVE_PROC_NULL && !(0..self.size).contains(&dest) {
            return self.fail(constants::ERR_RANK);
        }
        self.ok()
    }

    fn ssend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: MockDatatype,
        dest: i32,
        tag: i32,
        comm: MockComm,
    ) -> i32 {
        self.send(buf, count, datatype, dest, tag, comm)
    }

    fn recv(
        &mut self,
        _buf: &mut [u8],
        count: i32,
        datatype: MockDatatype,
        source: i32,
        tag: i32,
        comm: MockComm,
        status: Option<&mut MockStatus>,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let Some(bytes) = self.payload_bytes(count, datatype) else {
            return self.fail(constants::ERR_TYPE);
        };
        if let Some(status) = status {
            *status = MockStatus {
                source: self.resolve_rank(source),
                tag: self.resolve_tag(tag),
                error: self.ok(),
                stamp: bytes as u32,
            };
        }
        self.ok()
    }

    fn probe(
        &mut self,
        source: i32,
        tag: i32,
        comm: MockComm,
        status: Option<&mut MockStatus>,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        if let Some(status) = status {
            *status = MockStatus {
                source: self.resolve_rank(source),
                tag: self.resolve_tag(tag),
                error: self.ok(),
                stamp: 64,
            };
        }
        self.ok()
    }

    fn iprobe(
        &mut self,
        source: i32,
        tag: i32,
        comm: MockComm,
        flag: &mut bool,
        status: Option<&mut MockStatus>,
    ) -> i32 {
        *flag = true;
        self.probe(source, tag, comm, status)
    }

    fn get_count(&mut self, status: &MockStatus, datatype: MockDatatype, count: &mut i32) -> i32 {
        let Some(bytes) = self.type_bytes(datatype) else {
            return self.fail(constants::ERR_TYPE);
        };
        let stamp = status.stamp as i32;
        *count = if bytes > 0 && stamp % bytes == 0 {
            stamp / bytes
        } else {
            NATIVE_UNDEFINED
        };
        self.ok()
    }

    fn isend(
        &mut self,
        _buf: &[u8],
        count: i32,
        datatype: MockDatatype,
        dest: i32,
        tag: i32,
        comm: MockComm,
        request: &mut MockRequest,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let Some(bytes) = self.payload_bytes(count, datatype) else {
            return self.fail(constants::ERR_TYPE);
        };
        *request = self.post_request(dest, tag, bytes, false);
        self.ok()
    }

    fn issend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: MockDatatype,
        dest: i32,
        tag: i32,
        comm: MockComm,
        request: &mut MockRequest,
    ) -> i32 {
        self.isend(buf, count, datatype, dest, tag, comm, request)
    }

    fn irecv(
        &mut self,
        _buf: &mut [u8],
        count: i32,
        datatype: MockDatatype,
        source: i32,
        tag: i32,
        comm: MockComm,
        request: &mut MockRequest,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let Some(bytes) = self.payload_bytes(count, datatype) else {
            return self.fail(constants::ERR_TYPE);
        };
        *request = self.post_request(source, tag, bytes, false);
        self.ok()
    }

    fn send_init(
        &mut self,
        _buf: &[u8],
        count: i32,
        datatype: MockDatatype,
        dest: i32,
        tag: i32,
        comm: MockComm,
        request: &mut MockRequest,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let Some(bytes) = self.payload_bytes(count, datatype) else {
            return self.fail(constants::ERR_TYPE);
        };
        *request = self.post_request(dest, tag, bytes, true);
        self.ok()
    }

    fn recv_init(
        &mut self,
        _buf: &mut [u8],
        count: i32,
        datatype: MockDatatype,
        source: i32,
        tag: i32,
        comm: MockComm,
        request: &mut MockRequest,
    ) -> i32 {
        if !self.comms.contains_key(&comm.0) {
            return self.fail(constants::ERR_COMM);
        }
        let Some(bytes) = self.payload_bytes(count, datatype) else {
            return self.fail(constants::ERR_TYPE);
        };
        *request = self.post_request(source, tag, bytes, true);
        self.ok()
    }

    fn start(&mut self, request: &mut MockRequest) -> i32 {
        match self.requests.get_mut(&request.0) {
            Some(pending) if pending.persistent => {
                pending.active = true;
                self.ok()
            }
            _ => self.fail(constants::ERR_REQUEST),
        }
    }

    fn wait(&mut self, request: &mut MockRequest, status: Option<&mut MockStatus>) -> i32 {
        if !self.is_live_request(*request) {
            return self.ok();
        }
        self.finish(request, status);
        self.ok()
    }

    fn test(
        &mut self,
        request: &mut MockRequest,
        flag: &mut bool,
        status: Option<&mut MockStatus>,
    ) -> i32 {
        if !self.is_live_request(*request) {
            *flag = true;
            return self.ok();
        }
        if self.ready.contains(&request.0) {
            self.finish(request, status);
            *flag = true;
        } else {
            *flag = false;
        }
        self.ok()
    }

    fn waitall(&mut self, requests: &mut [MockRequest], statuses: Option<&mut [MockStatus]>) -> i32 {
        match statuses {
            Some(statuses) => {
                for (request, status) in requests.iter_mut().zip(statuses.iter_mut()) {
                    self.wait(request, Some(status));
                }
            }
            None => {
                for request in requests.iter_mut() {
                    self.wait(request, None);
                }
            }
        }
        self.ok()
    }

    fn waitany(
        &mut self,
        requests: &mut [MockRequest],
        index: &mut i32,
        status: Option<&mut MockStatus>,
    ) -> i32 {
        let live = requests.iter().position(|&r| self.is_live_request(r));
        match live {
            Some(i) => {
                self.finish(&mut requests[i], status);
                *index = i as i32;
            }
            None => *index = NATIVE_UNDEFINED,
        }
        self.ok()
    }

    fn waitsome(
        &mut self,
        requests: &mut [MockRequest],
        outcount: &mut i32,
        indices: &mut [i32],
        mut statuses: Option<&mut [MockStatus]>,
    ) -> i32 {
        if !requests.iter().any(|&r| self.is_live_request(r)) {
            *outcount = NATIVE_UNDEFINED;
            return self.ok();
        }
        let mut chosen: Vec<usize> = (0..requests.len())
            .filter(|&i| self.is_live_request(requests[i]) && self.ready.contains(&requests[i].0))
            .collect();
        if chosen.is_empty() {
            // Nothing scripted: behave like a blocking call and finish the
            // first outstanding request.
            let first = requests
                .iter()
                .position(|&r| self.is_live_request(r))
                .unwrap();
            chosen.push(first);
        }
        for (slot, &i) in chosen.iter().enumerate() {
            let status = statuses.as_deref_mut().map(|s| &mut s[slot]);
            self.finish(&mut requests[i], status);
            indices[slot] = i as i32;
        }
        *outcount = chosen.len() as i32;
        self.ok()
    }

    fn testall(&mut self, requests: &mut [MockRequest], flag: &mut bool, statuses: Option<&mut [MockStatus]>) -> i32 {
        let all_ready = requests
            .iter()
            .all(|&r| !self.is_live_request(r) || self.ready.contains(&r.0));
        if !all_ready {
            *flag = false;
            return self.ok();
        }
        *flag = true;
        self.waitall(requests, statuses)
    }

    fn testany(
        &mut self,
        requests: &mut [MockRequest],
        index: &mut i32,
        flag: &mut bool,
        status: Option<&mut MockStatus>,
    ) -> i32 {
        if !requests.iter().any(|&r| self.is_live_request(r)) {
            *flag = true;
            *index = NATIVE_UNDEFINED;
            return self.ok();
        }
        let ready = (0..requests.len())
            .find(|&i| self.is_live_request(requests[i]) && self.ready.contains(&requests[i].0));
        match ready {
            Some(i) => {
                self.finish(&mut requests[i], status);
                *index = i as i32;
                *flag = true;
            }
            None => {
                *index = NATIVE_UNDEFINED;
                *flag = false;
            }
        }
        self.ok()
    }

    fn testsome(
        &mut self,
        requests: &mut [MockRequest],
        outcount: &mut i32,
        indices: &mut [i32],
        mut statuses: Option<&mut [MockStatus]>,
    ) -> i32 {
        if !requests.iter().any(|&r| self.is_live_request(r)) {
            *outcount = NATIVE_UNDEFINED;
            return self.ok();
        }
        let chosen: Vec<usize> = (0..requests.len())
            .filter(|&i| self.is_live_request(requests[i]) && self.ready.contains(&requests[i].0))
            .collect();
        for (slot, &i) in chosen.iter().enumerate() {
            let status = statuses.as_deref_mut().map(|s| &mut s[slot]);
            self.finish(&mut requests[i], status);
            indices[slot] = i as i32;
        }
        *outcount = chosen.len() as i32;
        self.ok()
    }

    fn request_free(&mut self, request: &mut MockRequest) -> i32 {
        if self.requests.remove(&request.0).is_none() {
            return self.fail(constants::ERR_REQUEST);
        }
        self.ready.remove(&request.0);
        *request = Self::REQUEST_NULL;
        self.ok()
    }
}

/// Element size in bytes for a built-in datatype tag.
fn builtin_type_bytes(tag: i32) -> i32 {
    match tag {
        constants::TYPE_CHAR
        | constants::TYPE_UNSIGNED_CHAR
        | constants::TYPE_BYTE
        | constants::TYPE_PACKED
        | constants::TYPE_LOGICAL
        | constants::TYPE_INTEGER1 => 1,
        constants::TYPE_SHORT | constants::TYPE_UNSIGNED_SHORT | constants::TYPE_INTEGER2 => 2,
        constants::TYPE_LONG
        | constants::TYPE_UNSIGNED_LONG
        | constants::TYPE_DOUBLE
        | constants::TYPE_LONG_LONG_INT
        | constants::TYPE_INT64
        | constants::TYPE_UNSIGNED_LONG_LONG
        | constants::TYPE_2REAL
        | constants::TYPE_COMPLEX
        | constants::TYPE_2INT
        | constants::TYPE_INTEGER8
        | constants::TYPE_REAL8 => 8,
        constants::TYPE_LONG_DOUBLE
        | constants::TYPE_DOUBLE_COMPLEX
        | constants::TYPE_2DOUBLE_PRECISION
        | constants::TYPE_LONG_DOUBLE_INT => 16,
        _ => 4,
    }
}
