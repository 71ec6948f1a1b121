#![no_main]
use bppm::{compress, decompress, Config, Silent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u8>, u8)| {
    let (text, knobs) = data;

    // Low bits pick the arena size, high bits the order limit, so the
    // fuzzer also walks the degradation paths.
    let config = Config {
        memory_mib: 1 + u32::from(knobs & 0x03),
        order_limit: u32::from(knobs >> 6),
    };

    let code = compress(&text, &config, &mut Silent).unwrap();
    assert_eq!(code[..4], (text.len() as u32).to_be_bytes());
    assert_eq!(code[4], 0);

    let back = decompress(&code, &config, &mut Silent).unwrap();
    assert_eq!(text, back);
});
