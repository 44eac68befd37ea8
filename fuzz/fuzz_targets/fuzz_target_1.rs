#![no_main]

use libfuzzer_sys::fuzz_target;
use mpeg2ts_catalog::packet::PacketSize;
use mpeg2ts_catalog::session::PsiSession;
use mpeg2ts_catalog::source::SlicePacketSource;

fuzz_target!(|data: &[u8]| {
    let Ok(mut session) = PsiSession::new() else {
        return;
    };
    let mut source = SlicePacketSource::new(data, PacketSize::Ts188);
    if session.run(&mut source).is_ok() {
        let _catalog = session.build_catalog();
    }
});
