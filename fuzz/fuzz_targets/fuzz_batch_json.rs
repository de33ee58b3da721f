#![no_main]

use libfuzzer_sys::fuzz_target;
use splinesynth_kernel::render;
use splinesynth_spec::{validate_batch, BatchSpec, MAX_INSTANCES};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(batch) = serde_json::from_str::<BatchSpec>(text) else {
        return;
    };
    // Keep each run small; huge sample ranges only exercise the allocator.
    if batch.total_samples() > 1 << 16 || batch.instances.len() > MAX_INSTANCES {
        return;
    }
    let _ = validate_batch(&batch);
    let out = render::<f32>(&batch);
    assert_eq!(out.errors.len(), batch.instances.len());
    assert!(out.samples.iter().all(|s| s.is_finite()));
});
