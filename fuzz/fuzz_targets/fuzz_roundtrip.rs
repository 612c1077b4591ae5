#![no_main]
use libfuzzer_sys::fuzz_target;
use tagmend::serial::{serialize, serialize_to_string, SerializeOptions};
use tagmend::parse;
use tagmend::tree::Node;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse -> serialize -> parse should never panic
        if let Ok(doc) = parse(s) {
            let node = Node::from(doc);
            let options = SerializeOptions::default();
            let output = serialize_to_string(&node, &options);
            let _ = serialize(&node, &options.clone().charset("US-ASCII"));
            if let Ok(again) = parse(&output) {
                let _ = serialize_to_string(&Node::from(again), &options);
            }
        }
    }
});
