#![no_main]

use libfuzzer_sys::fuzz_target;
use icmp_client::Message;

fuzz_target!(|data: &[u8]| {
    // Received datagrams are untrusted: parsing must never panic
    let _ = Message::parse(data);
    let _ = Message::parse_icmp(data);
});
