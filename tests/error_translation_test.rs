//! Tests for error-code translation and the typed error surface.

use mpishim::core::constants::{
    COMM_WORLD, ERR_INTERN, ERR_RANK, ERR_TYPE, MODE_CREATE, MODE_WRONLY, SUCCESS, TYPE_INT,
};
use mpishim::runtime::mock::{self, MockRuntime};
use mpishim::shim::Shim;
use mpishim::{return_code, ShimError};

fn shim() -> Shim<MockRuntime> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut shim = Shim::new(MockRuntime::new());
    shim.init().unwrap();
    shim
}

#[test]
fn test_native_failure_is_translated() {
    let mut shim = shim();
    // Rank 99 does not exist in a four-rank world.
    let err = shim
        .send(&[0u8; 4], 1, TYPE_INT, 99, 0, COMM_WORLD)
        .unwrap_err();
    assert_eq!(err, ShimError::NativeCall { code: ERR_RANK });
    assert_eq!(err.code(), ERR_RANK);
}

#[test]
fn test_known_codes_round_trip_through_tables() {
    let mut shim = shim();
    for code in [SUCCESS, ERR_RANK, ERR_TYPE, ERR_INTERN] {
        let native = shim.error_to_native(code).unwrap();
        assert_eq!(native, mock::native_error(code));
        assert_eq!(shim.session().unwrap().error_to_shim(native), code);
    }
}

#[test]
fn test_unknown_native_code_degrades_to_intern() {
    let shim = shim();
    assert_eq!(shim.session().unwrap().error_to_shim(123456), ERR_INTERN);
}

#[test]
fn test_invalid_handle_reports_kind_error_code() {
    let mut shim = shim();
    let err = shim.type_size(9999).unwrap_err();
    assert!(matches!(err, ShimError::InvalidHandle { .. }));
    assert_eq!(err.code(), ERR_TYPE);
}

#[test]
fn test_return_code_flattens_results() {
    let mut shim = shim();
    let ok = shim.comm_rank(COMM_WORLD);
    assert_eq!(return_code(&ok), SUCCESS);
    let err = shim.type_size(9999);
    assert_eq!(return_code(&err), ERR_TYPE);
}

#[test]
fn test_operations_before_init_are_rejected() {
    let mut shim = Shim::new(MockRuntime::new());
    assert_eq!(shim.comm_rank(COMM_WORLD), Err(ShimError::Uninitialized));
}

#[test]
fn test_operations_after_finalize_are_rejected() {
    let mut shim = shim();
    shim.finalize().unwrap();
    assert_eq!(shim.comm_rank(COMM_WORLD), Err(ShimError::Uninitialized));
    assert!(shim.finalized().unwrap());
}

#[test]
fn test_initialized_flag_lifecycle() {
    let mut shim = Shim::new(MockRuntime::new());
    assert!(!shim.initialized().unwrap());
    shim.init().unwrap();
    assert!(shim.initialized().unwrap());
    assert!(!shim.finalized().unwrap());
}

#[test]
fn test_file_mode_bits_translate_in_combination() {
    let mut shim = shim();
    let info = shim.info_create().unwrap();
    let mut file = shim
        .file_open(COMM_WORLD, "out.dat", MODE_CREATE | MODE_WRONLY, info)
        .unwrap();
    // The mock's native mode space is disjoint from the shim's.
    let (name, amode) = shim.runtime().last_open().cloned().unwrap();
    assert_eq!(name, "out.dat");
    assert_eq!(amode, 0x0100 | 0x0400);

    shim.file_close(&mut file).unwrap();
    let mut info = info;
    shim.info_free(&mut info).unwrap();
}

#[test]
fn test_op_lifecycle_and_static_guard() {
    let mut shim = shim();
    let mut op = shim.op_create(true).unwrap();
    shim.op_free(&mut op).unwrap();

    let mut sum = mpishim::core::constants::OP_SUM;
    assert!(matches!(
        shim.op_free(&mut sum),
        Err(ShimError::StaticHandle { .. })
    ));
}

#[test]
fn test_info_dup_creates_independent_handle() {
    let mut shim = shim();
    let info = shim.info_create().unwrap();
    let mut dup = shim.info_dup(info).unwrap();
    assert_ne!(info, dup);
    shim.info_free(&mut dup).unwrap();
    // Original still valid.
    let mut original = info;
    shim.info_free(&mut original).unwrap();
}
