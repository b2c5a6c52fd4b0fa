#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(head) = barehttp::codec::parse_head(data) else {
        return;
    };
    let _ = head.status;
    let _ = head.version;
    for (name, value) in &head.headers {
        let _ = name.as_str();
        let _ = value.to_str();
    }
});
