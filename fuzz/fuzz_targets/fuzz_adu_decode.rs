#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_clock::{handle, AduCodec, ClockReading, FixedClock};

fuzz_target!(|data: &[u8]| {
    // Any frame that decodes must produce an encodable response
    if let Ok(request) = AduCodec::decode(data) {
        let clock = FixedClock(ClockReading::new(15, 6, 2025, 10, 30, 45));
        let response = handle(&request, &clock);
        let bytes = AduCodec::encode_response(&response).unwrap();
        assert_eq!(&bytes[..2], &data[..2]);
        assert_eq!(bytes[6], data[6]);
    }
});
