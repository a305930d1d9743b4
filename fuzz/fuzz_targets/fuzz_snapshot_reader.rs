#![no_main]

use libfuzzer_sys::fuzz_target;
use quarry_snapshot::format;
use quarry_storage::StoreConfig;

fuzz_target!(|data: &[u8]| {
    // Limit input size
    if data.len() > 1_000_000 {
        return;
    }

    // Malformed files must fail with an error, never a panic
    for verify in [true, false] {
        if let Ok((_, image)) = format::decode(data, verify) {
            let _ = image.restore(StoreConfig::default());
        }
    }
});
