#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate pck_core;

use pck_core::{PackageBuf, PackageSrc};

fuzz_target!(|data: &[u8]| {
    let src = PackageBuf::new(data);
    if let Ok(head) = src.clone().read_head() {
        for (name, entry) in head.entries() {
            assert!(!name.is_empty());
            assert!(u64::from(entry.offset()) >= head.data_start());

            let entry_data = src.entry_data(entry).expect("accepted entry out of bounds");
            assert_eq!(entry_data.len() as u64, u64::from(entry.size()));
        }
    }
});
