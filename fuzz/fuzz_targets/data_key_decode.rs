#![no_main]

use libfuzzer_sys::fuzz_target;
use listdb::codec::DataKey;

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = DataKey::decode(data) {
        // Decoded keys must re-encode to the exact input bytes.
        assert_eq!(key.encode_to_vec(), data);
    }
});
