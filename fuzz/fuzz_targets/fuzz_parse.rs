#![no_main]
use libfuzzer_sys::fuzz_target;
use tagmend::encoding::{decode_lossy, Charset};
use tagmend::{parse, parse_xml};

fuzz_target!(|data: &[u8]| {
    // Tag balancing never fails, so only construct errors may come back;
    // neither mode may panic on any input.
    let text = decode_lossy(data, Charset::utf8());
    let _ = parse(&text);
    let _ = parse_xml(&text);
});
