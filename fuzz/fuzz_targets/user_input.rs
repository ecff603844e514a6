//! Fuzz target for address and FIL amount parsing.
//!
//! Both come from CLI arguments and batch files. Whatever parses must print
//! back to a string that parses to the same value.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run user_input
//! ```

#![no_main]

use filsign_chain::{Address, TokenAmount};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(address) = input.parse::<Address>() {
        let reparsed: Address = address
            .to_string()
            .parse()
            .expect("displayed address parses");
        assert_eq!(reparsed, address);
        let _ = Address::from_bytes(&address.to_bytes());
    }

    if let Ok(amount) = TokenAmount::parse_fil(input) {
        let reparsed = TokenAmount::parse_fil(&amount.to_string()).expect("displayed amount parses");
        assert_eq!(reparsed, amount);
    }
});
