#![no_main]

use libfuzzer_sys::fuzz_target;
use songbook_schema::{conform, flatten, unflatten, Descriptor, Schema};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(descriptor) = Descriptor::from_json_str(text) else {
        return;
    };

    let schema = Schema::standard();
    let mut flat = flatten(&descriptor);
    conform(schema, &mut flat);
    let normalized = unflatten(&flat, schema);

    let json = normalized
        .to_json_string(schema)
        .expect("normalized descriptor must serialize");
    let reparsed = Descriptor::from_json_str(&json).expect("written descriptor must parse");
    assert_eq!(flatten(&reparsed), flat);
});
