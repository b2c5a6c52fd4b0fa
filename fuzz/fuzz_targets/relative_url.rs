#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if barehttp::url::is_relative_url(s) {
        let _ = barehttp::url::extract_relative_components(s);
    }
});
