//! Randomized allocate/release stress test of the handle pools through the
//! public datatype API: no two live handles alias, lookups stay stable
//! across growth, and the native object count tracks the handle count.

use mpishim::core::constants::TYPE_INT;
use mpishim::runtime::mock::MockRuntime;
use mpishim::shim::Shim;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_random_allocate_release_keeps_pool_consistent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut shim = Shim::new(MockRuntime::new());
    shim.init().unwrap();
    let builtin_count = shim.runtime().live_datatypes();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    // (handle, expected size) for every live derived type.
    let mut live: Vec<(i32, i32)> = Vec::new();

    for step in 0..2000 {
        if live.is_empty() || rng.gen_bool(0.55) {
            let count = rng.gen_range(1..=16);
            let handle = shim.type_contiguous(count, TYPE_INT).unwrap();
            assert!(
                live.iter().all(|&(h, _)| h != handle),
                "step {step}: live handle {handle} aliased"
            );
            live.push((handle, count * 4));
        } else {
            let victim = rng.gen_range(0..live.len());
            let (handle, _) = live.swap_remove(victim);
            let mut h = handle;
            shim.type_free(&mut h).unwrap();
        }

        // Every surviving handle still resolves to its own object.
        if step % 251 == 0 {
            for &(handle, size) in &live {
                assert_eq!(shim.type_size(handle).unwrap(), size);
            }
        }
    }

    for &(handle, size) in &live {
        assert_eq!(shim.type_size(handle).unwrap(), size);
    }
    assert_eq!(shim.runtime().live_datatypes(), builtin_count + live.len());

    for (handle, _) in live {
        let mut h = handle;
        shim.type_free(&mut h).unwrap();
    }
    assert_eq!(shim.runtime().live_datatypes(), builtin_count);
}
