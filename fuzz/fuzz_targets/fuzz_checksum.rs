#![no_main]

use libfuzzer_sys::fuzz_target;
use icmp_client::{checksum, ChecksumAlgorithm};

fuzz_target!(|data: &[u8]| {
    let _ = checksum(data);
    let _ = ChecksumAlgorithm::Rfc1071.verify(data);
    let _ = ChecksumAlgorithm::Legacy.verify(data);
});
