#![no_main]

use libfuzzer_sys::fuzz_target;
use notelog_core::EventSorter;
use notelog_core::event::EventSetFile;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(loaded) = EventSetFile::from_json(text).and_then(EventSetFile::into_event_set) else {
        return;
    };
    // Out-of-set dependencies are an error, never a panic.
    let _ = EventSorter::new(&loaded.set).order(&loaded.working);
});
