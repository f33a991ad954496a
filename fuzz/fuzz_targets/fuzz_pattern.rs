#![no_main]

use libfuzzer_sys::fuzz_target;
use srcdex::index::pattern::TermMatcher;

fuzz_target!(|data: &str| {
    // Pattern compilation and matching should not panic
    let Some((pattern, term)) = data.split_once('\n') else {
        return;
    };
    for case_sensitive in [true, false] {
        if let Ok(matcher) = TermMatcher::pattern(pattern, case_sensitive) {
            let _ = matcher.matches(term);
            let _ = matcher.is_past(term);
        }
    }
});
