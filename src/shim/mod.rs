// This module is the call-forwarding boundary the rest of a client links
// against. Shim owns the native runtime instance and the translation session;
// every entry point translates its shim handles and constants into native
// values, invokes the runtime, reflects the outcome back into the handle
// pools, and translates the final return code. Entry points are grouped by
// concern: object management (communicators, groups, datatypes, reductions,
// info objects, files) in `objects`, message transfer and request completion
// in `transfer`, and the environment calls here.

//! Call forwarding over a [`NativeRuntime`].

mod objects;
mod transfer;

use log::debug;

use crate::core::constants;
use crate::core::error::{ShimError, ShimResult};
use crate::core::session::TranslationSession;
use crate::runtime::NativeRuntime;

/// The client-facing translation boundary.
///
/// Constructed around a runtime, inert until [`Shim::init`], torn down by
/// [`Shim::finalize`]. Dynamic operations between those two calls; anything
/// else reports [`ShimError::Uninitialized`].
pub struct Shim<R: NativeRuntime> {
    pub(crate) runtime: R,
    pub(crate) session: Option<TranslationSession<R>>,
}

impl<R: NativeRuntime> Shim<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            session: None,
        }
    }

    /// The wrapped runtime, for bindings that need direct access.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// The live translation session.
    pub fn session(&self) -> ShimResult<&TranslationSession<R>> {
        self.session.as_ref().ok_or(ShimError::Uninitialized)
    }

    /// Initialize the native runtime and build the translation session.
    pub fn init(&mut self) -> ShimResult<()> {
        let code = self.runtime.init();
        let session = TranslationSession::initialize(&mut self.runtime)?;
        let result = session.native_result(code);
        self.session = Some(session);
        debug!("shim initialized");
        result
    }

    /// Finalize the native runtime and tear down all pools in bulk.
    ///
    /// Outstanding dynamic handles are not individually freed; the backing
    /// storage is dropped wholesale.
    pub fn finalize(&mut self) -> ShimResult<()> {
        let session = self.session.take().ok_or(ShimError::Uninitialized)?;
        session.log_teardown();
        let code = self.runtime.finalize();
        session.native_result(code)
    }

    /// Whether the native runtime has been initialized.
    ///
    /// Callable before [`Shim::init`], mirroring the underlying API.
    pub fn initialized(&mut self) -> ShimResult<bool> {
        let mut flag = false;
        let code = self.runtime.initialized(&mut flag);
        self.environment_result(code)?;
        Ok(flag)
    }

    /// Whether the native runtime has been finalized.
    pub fn finalized(&mut self) -> ShimResult<bool> {
        let mut flag = false;
        let code = self.runtime.finalized(&mut flag);
        self.environment_result(code)?;
        Ok(flag)
    }

    /// Translate a shim error code back into native space.
    ///
    /// Needed when a shim-level constant must be handed to a native call
    /// (custom error-handler invocation).
    pub fn error_to_native(&self, shim: i32) -> ShimResult<i32> {
        Ok(self.session()?.error_to_native(shim))
    }

    /// Result translation for calls legal outside the session lifetime.
    fn environment_result(&self, code: i32) -> ShimResult<()> {
        match &self.session {
            Some(session) => session.native_result(code),
            None if code == self.runtime.native_success() => Ok(()),
            None => Err(ShimError::NativeCall {
                code: constants::ERR_INTERN,
            }),
        }
    }
}
