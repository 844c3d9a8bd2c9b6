//! Message-transfer entry points: blocking and non-blocking point-to-point,
//! probes, and the request-completion family.
//!
//! Status handling follows one rule everywhere: `None` means "ignore" and is
//! passed straight through to the native layer before any conversion is
//! attempted; `Some` statuses are converted element-wise after the native
//! call. Request handles are reset to the null handle exactly when the native
//! layer nulls the underlying request, per element for the array calls, and
//! the native undefined outcount/index sentinel surfaces as the shim
//! `UNDEFINED` constant.

use crate::core::constants::{Comm, Datatype, Request, UNDEFINED};
use crate::core::error::{ShimError, ShimResult};
use crate::core::status::{to_native, to_shim, Status};
use crate::runtime::NativeRuntime;

use super::Shim;

impl<R: NativeRuntime> Shim<R> {
    // ---- blocking point-to-point -------------------------------------------

    pub fn send(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Datatype,
        dest: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<()> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let dest = session.rank_to_native(dest);
        let code = self.runtime.send(buf, count, dt, dest, tag, c);
        session.native_result(code)
    }

    pub fn ssend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Datatype,
        dest: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<()> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let dest = session.rank_to_native(dest);
        let code = self.runtime.ssend(buf, count, dt, dest, tag, c);
        session.native_result(code)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn recv(
        &mut self,
        buf: &mut [u8],
        count: i32,
        datatype: Datatype,
        source: i32,
        tag: i32,
        comm: Comm,
        status: Option<&mut Status>,
    ) -> ShimResult<()> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let source = session.rank_to_native(source);
        let tag = session.tag_to_native(tag);
        let code = match status {
            Some(status) => {
                let mut native = R::Status::default();
                let code = self
                    .runtime
                    .recv(buf, count, dt, source, tag, c, Some(&mut native));
                *status = to_shim::<R>(&native);
                code
            }
            None => self.runtime.recv(buf, count, dt, source, tag, c, None),
        };
        session.native_result(code)
    }

    pub fn probe(
        &mut self,
        source: i32,
        tag: i32,
        comm: Comm,
        status: Option<&mut Status>,
    ) -> ShimResult<()> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let c = session.comm(comm)?;
        let source = session.rank_to_native(source);
        let tag = session.tag_to_native(tag);
        let code = match status {
            Some(status) => {
                let mut native = R::Status::default();
                let code = self.runtime.probe(source, tag, c, Some(&mut native));
                *status = to_shim::<R>(&native);
                code
            }
            None => self.runtime.probe(source, tag, c, None),
        };
        session.native_result(code)
    }

    /// Non-blocking probe; the status is written only when a message is
    /// pending.
    pub fn iprobe(
        &mut self,
        source: i32,
        tag: i32,
        comm: Comm,
        status: Option<&mut Status>,
    ) -> ShimResult<bool> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let c = session.comm(comm)?;
        let source = session.rank_to_native(source);
        let tag = session.tag_to_native(tag);
        let mut flag = false;
        let code = match status {
            Some(status) => {
                let mut native = R::Status::default();
                let code = self
                    .runtime
                    .iprobe(source, tag, c, &mut flag, Some(&mut native));
                if flag {
                    *status = to_shim::<R>(&native);
                }
                code
            }
            None => self.runtime.iprobe(source, tag, c, &mut flag, None),
        };
        session.native_result(code)?;
        Ok(flag)
    }

    /// Number of elements a received status describes, re-submitting the
    /// opaque native record to the runtime.
    pub fn get_count(&mut self, status: &Status, datatype: Datatype) -> ShimResult<i32> {
        let session = self.session.as_ref().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let native = to_native::<R>(status);
        let mut count = 0;
        session.native_result(self.runtime.get_count(&native, dt, &mut count))?;
        Ok(session.undefined_to_shim(count))
    }

    // ---- non-blocking initiation ----------------------------------------------

    pub fn isend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Datatype,
        dest: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<Request> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let dest = session.rank_to_native(dest);
        let mut request = R::REQUEST_NULL;
        session.native_result(
            self.runtime
                .isend(buf, count, dt, dest, tag, c, &mut request),
        )?;
        Ok(session.requests.start(request))
    }

    pub fn issend(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Datatype,
        dest: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<Request> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let dest = session.rank_to_native(dest);
        let mut request = R::REQUEST_NULL;
        session.native_result(
            self.runtime
                .issend(buf, count, dt, dest, tag, c, &mut request),
        )?;
        Ok(session.requests.start(request))
    }

    pub fn irecv(
        &mut self,
        buf: &mut [u8],
        count: i32,
        datatype: Datatype,
        source: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<Request> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let source = session.rank_to_native(source);
        let tag = session.tag_to_native(tag);
        let mut request = R::REQUEST_NULL;
        session.native_result(
            self.runtime
                .irecv(buf, count, dt, source, tag, c, &mut request),
        )?;
        Ok(session.requests.start(request))
    }

    /// Create a persistent send request; activate it with [`Shim::start`].
    pub fn send_init(
        &mut self,
        buf: &[u8],
        count: i32,
        datatype: Datatype,
        dest: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<Request> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let dest = session.rank_to_native(dest);
        let mut request = R::REQUEST_NULL;
        session.native_result(
            self.runtime
                .send_init(buf, count, dt, dest, tag, c, &mut request),
        )?;
        Ok(session.requests.start(request))
    }

    /// Create a persistent receive request.
    pub fn recv_init(
        &mut self,
        buf: &mut [u8],
        count: i32,
        datatype: Datatype,
        source: i32,
        tag: i32,
        comm: Comm,
    ) -> ShimResult<Request> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let dt = session.datatype(datatype)?;
        let c = session.comm(comm)?;
        let source = session.rank_to_native(source);
        let tag = session.tag_to_native(tag);
        let mut request = R::REQUEST_NULL;
        session.native_result(
            self.runtime
                .recv_init(buf, count, dt, source, tag, c, &mut request),
        )?;
        Ok(session.requests.start(request))
    }

    /// Activate a persistent request.
    pub fn start(&mut self, request: Request) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.requests.lookup(request)?;
        let code = self.runtime.start(&mut native);
        session.requests.update(request, native)?;
        session.native_result(code)
    }

    // ---- completion ---------------------------------------------------------

    /// Block until the request completes. A completed non-persistent request
    /// resets the handle to the null handle.
    pub fn wait(&mut self, request: &mut Request, status: Option<&mut Status>) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.requests.lookup(*request)?;
        let code = match status {
            Some(status) => {
                let mut ns = R::Status::default();
                let code = self.runtime.wait(&mut native, Some(&mut ns));
                *status = to_shim::<R>(&ns);
                code
            }
            None => self.runtime.wait(&mut native, None),
        };
        session.requests.complete_one(request, native)?;
        session.native_result(code)
    }

    /// Poll a request; the status is written only when it completed.
    pub fn test(&mut self, request: &mut Request, status: Option<&mut Status>) -> ShimResult<bool> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.requests.lookup(*request)?;
        let mut flag = false;
        let code = match status {
            Some(status) => {
                let mut ns = R::Status::default();
                let code = self.runtime.test(&mut native, &mut flag, Some(&mut ns));
                if flag {
                    *status = to_shim::<R>(&ns);
                }
                code
            }
            None => self.runtime.test(&mut native, &mut flag, None),
        };
        session.requests.complete_one(request, native)?;
        session.native_result(code)?;
        Ok(flag)
    }

    /// Wait for every request; all handles reset as their requests complete.
    pub fn waitall(
        &mut self,
        requests: &mut [Request],
        statuses: Option<&mut [Status]>,
    ) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut natives = session.requests.lookup_array(requests)?;
        let code = match statuses {
            Some(statuses) => {
                debug_assert_eq!(statuses.len(), requests.len());
                let mut ns = vec![R::Status::default(); requests.len()];
                let code = self.runtime.waitall(&mut natives, Some(&mut ns));
                for (status, native) in statuses.iter_mut().zip(&ns) {
                    *status = to_shim::<R>(native);
                }
                code
            }
            None => self.runtime.waitall(&mut natives, None),
        };
        session.requests.complete_array(requests, &natives)?;
        session.native_result(code)
    }

    /// Wait for any one request; returns its index, or `UNDEFINED` when every
    /// handle was already null.
    pub fn waitany(
        &mut self,
        requests: &mut [Request],
        status: Option<&mut Status>,
    ) -> ShimResult<i32> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut natives = session.requests.lookup_array(requests)?;
        let mut index = 0;
        let code = match status {
            Some(status) => {
                let mut ns = R::Status::default();
                let code = self.runtime.waitany(&mut natives, &mut index, Some(&mut ns));
                if !session.is_native_undefined(index) {
                    *status = to_shim::<R>(&ns);
                }
                code
            }
            None => self.runtime.waitany(&mut natives, &mut index, None),
        };
        if session.is_native_undefined(index) {
            session.native_result(code)?;
            return Ok(UNDEFINED);
        }
        session
            .requests
            .complete_one(&mut requests[index as usize], natives[index as usize])?;
        session.native_result(code)?;
        Ok(index)
    }

    /// Wait for at least one request; completed indices land in `indices`
    /// and the count is returned, or `UNDEFINED` when every handle was null.
    pub fn waitsome(
        &mut self,
        requests: &mut [Request],
        indices: &mut [i32],
        statuses: Option<&mut [Status]>,
    ) -> ShimResult<i32> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut natives = session.requests.lookup_array(requests)?;
        let mut outcount = 0;
        let code = match statuses {
            Some(statuses) => {
                let mut ns = vec![R::Status::default(); requests.len()];
                let code =
                    self.runtime
                        .waitsome(&mut natives, &mut outcount, indices, Some(&mut ns));
                if !session.is_native_undefined(outcount) {
                    for k in 0..outcount as usize {
                        statuses[k] = to_shim::<R>(&ns[k]);
                    }
                }
                code
            }
            None => self
                .runtime
                .waitsome(&mut natives, &mut outcount, indices, None),
        };
        if session.is_native_undefined(outcount) {
            session.native_result(code)?;
            return Ok(UNDEFINED);
        }
        session
            .requests
            .complete_indexed(requests, &natives, &indices[..outcount as usize])?;
        session.native_result(code)?;
        Ok(outcount)
    }

    /// Poll every request; handles reset only when all of them completed.
    pub fn testall(
        &mut self,
        requests: &mut [Request],
        statuses: Option<&mut [Status]>,
    ) -> ShimResult<bool> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut natives = session.requests.lookup_array(requests)?;
        let mut flag = false;
        let code = match statuses {
            Some(statuses) => {
                debug_assert_eq!(statuses.len(), requests.len());
                let mut ns = vec![R::Status::default(); requests.len()];
                let code = self.runtime.testall(&mut natives, &mut flag, Some(&mut ns));
                if flag {
                    for (status, native) in statuses.iter_mut().zip(&ns) {
                        *status = to_shim::<R>(native);
                    }
                }
                code
            }
            None => self.runtime.testall(&mut natives, &mut flag, None),
        };
        if flag {
            session.requests.complete_array(requests, &natives)?;
        }
        session.native_result(code)?;
        Ok(flag)
    }

    /// Poll for any one completion; `(flag, index)` mirrors the native call,
    /// with `UNDEFINED` when nothing completed or every handle was null.
    pub fn testany(
        &mut self,
        requests: &mut [Request],
        status: Option<&mut Status>,
    ) -> ShimResult<(bool, i32)> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut natives = session.requests.lookup_array(requests)?;
        let mut index = 0;
        let mut flag = false;
        let code = match status {
            Some(status) => {
                let mut ns = R::Status::default();
                let code =
                    self.runtime
                        .testany(&mut natives, &mut index, &mut flag, Some(&mut ns));
                if flag && !session.is_native_undefined(index) {
                    *status = to_shim::<R>(&ns);
                }
                code
            }
            None => self.runtime.testany(&mut natives, &mut index, &mut flag, None),
        };
        if session.is_native_undefined(index) {
            session.native_result(code)?;
            return Ok((flag, UNDEFINED));
        }
        if flag {
            session
                .requests
                .complete_one(&mut requests[index as usize], natives[index as usize])?;
        }
        session.native_result(code)?;
        Ok((flag, index))
    }

    /// Poll for multiple completions; like [`Shim::waitsome`] but never
    /// blocking, so the count may be zero.
    pub fn testsome(
        &mut self,
        requests: &mut [Request],
        indices: &mut [i32],
        statuses: Option<&mut [Status]>,
    ) -> ShimResult<i32> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut natives = session.requests.lookup_array(requests)?;
        let mut outcount = 0;
        let code = match statuses {
            Some(statuses) => {
                let mut ns = vec![R::Status::default(); requests.len()];
                let code =
                    self.runtime
                        .testsome(&mut natives, &mut outcount, indices, Some(&mut ns));
                if !session.is_native_undefined(outcount) {
                    for k in 0..outcount as usize {
                        statuses[k] = to_shim::<R>(&ns[k]);
                    }
                }
                code
            }
            None => self
                .runtime
                .testsome(&mut natives, &mut outcount, indices, None),
        };
        if session.is_native_undefined(outcount) {
            session.native_result(code)?;
            return Ok(UNDEFINED);
        }
        session
            .requests
            .complete_indexed(requests, &natives, &indices[..outcount as usize])?;
        session.native_result(code)?;
        Ok(outcount)
    }

    /// Release a request without waiting for it.
    pub fn request_free(&mut self, request: &mut Request) -> ShimResult<()> {
        let session = self.session.as_mut().ok_or(ShimError::Uninitialized)?;
        let mut native = session.requests.lookup(*request)?;
        let code = self.runtime.request_free(&mut native);
        session.native_result(code)?;
        session.requests.invalidate(request)
    }
}
