#![no_main]

use libfuzzer_sys::fuzz_target;
use quarry_core::query::{fold, Case, TextPattern};

fuzz_target!(|input: (String, String)| {
    let (haystack, needle) = input;
    if haystack.len() > 4096 || needle.len() > 4096 {
        return;
    }

    let folded = fold(&haystack);
    if haystack.is_ascii() {
        assert_eq!(folded, haystack.to_ascii_lowercase());
    }

    // Every string matches itself under both modes
    for case in [Case::Sensitive, Case::Insensitive] {
        let own = TextPattern::new(haystack.as_str(), case);
        assert!(own.equals(&haystack));
        assert!(own.begins(&haystack));
        assert!(own.ends(&haystack));
        assert!(own.contained_in(&haystack));
    }

    // A sensitive match implies an insensitive one
    let sensitive = TextPattern::new(needle.as_str(), Case::Sensitive);
    let insensitive = TextPattern::new(needle.as_str(), Case::Insensitive);
    if sensitive.contained_in(&haystack) {
        assert!(insensitive.contained_in(&haystack));
    }
});
