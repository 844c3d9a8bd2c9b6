//! Constant translation tables.
//!
//! Bidirectional mappings between the shim's numeric constants and the native
//! runtime's. Built once at initialization from runtime-supplied pairs and
//! immutable afterwards, so lookups need no synchronization.

use hashbrown::HashMap;

use super::constants;

/// Immutable constant-translation tables for one runtime.
#[derive(Debug)]
pub struct ConstantTables {
    error_to_shim: HashMap<i32, i32>,
    error_to_native: HashMap<i32, i32>,
    comparison_to_shim: HashMap<i32, i32>,
    /// (shim bit, native bit) pairs for file access modes.
    amode_bits: Vec<(i32, i32)>,
    native_internal_error: i32,
}

impl ConstantTables {
    /// Build the tables.
    ///
    /// `errors` holds (shim, native) code pairs, `comparisons` holds
    /// (native, shim) comparison-result pairs, `amodes` holds
    /// (shim bit, native bit) access-mode pairs.
    pub fn build(
        errors: &[(i32, i32)],
        comparisons: &[(i32, i32)],
        amodes: &[(i32, i32)],
        native_internal_error: i32,
    ) -> Self {
        let mut error_to_shim = HashMap::with_capacity(errors.len());
        let mut error_to_native = HashMap::with_capacity(errors.len());
        for &(shim, native) in errors {
            error_to_shim.insert(native, shim);
            error_to_native.insert(shim, native);
        }
        let comparison_to_shim = comparisons.iter().copied().collect();
        Self {
            error_to_shim,
            error_to_native,
            comparison_to_shim,
            amode_bits: amodes.to_vec(),
            native_internal_error,
        }
    }

    /// Translate a native error code into shim space.
    ///
    /// Unrecognized codes degrade to [`constants::ERR_INTERN`] rather than
    /// failing; the native layer may grow codes the table never saw.
    pub fn error_to_shim(&self, native: i32) -> i32 {
        self.error_to_shim
            .get(&native)
            .copied()
            .unwrap_or(constants::ERR_INTERN)
    }

    /// Translate a shim error code back into native space.
    pub fn error_to_native(&self, shim: i32) -> i32 {
        self.error_to_native
            .get(&shim)
            .copied()
            .unwrap_or(self.native_internal_error)
    }

    /// Translate a native comparison result into shim space.
    ///
    /// Unrecognized values conservatively report [`constants::UNEQUAL`].
    pub fn comparison_to_shim(&self, native: i32) -> i32 {
        self.comparison_to_shim
            .get(&native)
            .copied()
            .unwrap_or(constants::UNEQUAL)
    }

    /// Translate a shim file access mode into native space, bit by bit.
    ///
    /// Modes combine with bitwise OR, so each known bit is translated
    /// independently; bits the table does not know pass through unchanged.
    pub fn amode_to_native(&self, shim: i32) -> i32 {
        let mut remaining = shim;
        let mut native = 0;
        for &(shim_bit, native_bit) in &self.amode_bits {
            if remaining & shim_bit != 0 {
                native |= native_bit;
                remaining &= !shim_bit;
            }
        }
        native | remaining
    }
}
