#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsteward::{Document, ParseOptions};

// Splits the input into a document and a fragment, unlinks whatever the
// first path matches, and tears everything down. Teardown must never free a
// handle twice.
fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let (content, fragment) = data.split_at(split);
    let fragment = fragment.get(1..).unwrap_or_default();

    for options in [ParseOptions::NONE, ParseOptions::default()] {
        let Ok(mut doc) = Document::create(content, "", "", options, "") else {
            continue;
        };
        let _ = doc.parse_fragment(fragment, "", options);
        if let Ok(hits) = doc.search(&doc.root(), "//*") {
            for node in hits.iter().skip(1).step_by(2) {
                let _ = doc.unlink(node);
            }
        }
        let report = doc.free();
        let mut freed = report.freed_nodes.clone();
        freed.sort();
        freed.dedup();
        assert_eq!(freed.len(), report.freed_nodes.len());
    }
});
