#![no_main]

use libfuzzer_sys::fuzz_target;
use rowbind_convert::builtin::parse_auto_base;

// Fuzz target: auto-base integer parsing.
//
// Every text accepted as i64 must be accepted as i128 with the same
// value. Positive values also fit u64, negative ones never do.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let narrow = parse_auto_base::<i64>(text);
    let wide = parse_auto_base::<i128>(text);
    if let Ok(v) = narrow {
        assert_eq!(wide, Ok(i128::from(v)));
        let unsigned = parse_auto_base::<u64>(text);
        if v > 0 {
            assert_eq!(unsigned.map(i128::from), Ok(i128::from(v)));
        } else if v < 0 {
            assert!(unsigned.is_err());
        }
    }
});
