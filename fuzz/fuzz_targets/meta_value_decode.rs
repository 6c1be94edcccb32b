#![no_main]

use libfuzzer_sys::fuzz_target;
use listdb::codec::MetaValue;

fuzz_target!(|data: &[u8]| {
    if let Ok(meta) = MetaValue::decode(data) {
        assert_eq!(meta.encode_to_vec(), data);
    }
});
