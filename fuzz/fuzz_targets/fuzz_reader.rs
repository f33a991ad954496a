#![no_main]

use libfuzzer_sys::fuzz_target;
use srcdex::index::pattern::TermMatcher;
use srcdex::index::DurableIndexReader;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must surface as errors, never panics or huge allocations
    let Ok(reader) = DurableIndexReader::from_bytes(data.to_vec()) else {
        return;
    };
    let _ = reader.verify();
    for doc in reader.documents() {
        if doc.is_err() {
            break;
        }
    }
    let _ = reader.find_words(&TermMatcher::prefix("a", false));
    let _ = reader.includes().collect::<Vec<_>>();
    let _ = reader.document_table();
});
