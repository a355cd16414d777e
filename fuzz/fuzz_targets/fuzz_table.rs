#![no_main]

use libfuzzer_sys::fuzz_target;
use songbook_cli::loaders::{records_from_table, Table};
use songbook_schema::Schema;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(table) = Table::parse(text) {
        let _ = records_from_table(&table, Schema::standard());
    }
});
