use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use mpeg2ts_catalog::mpegts_crc;
use mpeg2ts_catalog::packet::PacketSize;
use mpeg2ts_catalog::session::PsiSession;
use mpeg2ts_catalog::source::SlicePacketSource;

fn section(table_id: u8, id: u16, body: &[u8]) -> Vec<u8> {
    let len = 5 + body.len() + mpegts_crc::CRC_SIZE;
    let mut data = vec![
        table_id,
        0xb0 | (len >> 8) as u8,
        len as u8,
        (id >> 8) as u8,
        id as u8,
        0xc1,
        0,
        0,
    ];
    data.extend_from_slice(body);
    let crc = mpegts_crc::sum32(&data);
    data.extend_from_slice(&crc.to_be_bytes());
    data
}

fn packetize(out: &mut Vec<u8>, pid: u16, section: &[u8]) {
    let mut rest = section;
    let mut first = true;
    while first || !rest.is_empty() {
        let start = out.len();
        out.push(0x47);
        out.push(if first { 0x40 } else { 0 } | (pid >> 8) as u8);
        out.push(pid as u8);
        out.push(0x10);
        if first {
            out.push(0);
        }
        let n = rest.len().min(188 - (out.len() - start));
        out.extend_from_slice(&rest[..n]);
        rest = &rest[n..];
        out.resize(start + 188, 0xff);
        first = false;
    }
}

/// PAT, PMT and SDT for 8 programs, then a programme guide of 200 sections.
fn stream() -> Vec<u8> {
    let mut out = Vec::new();
    let mut pat = Vec::new();
    let mut sdt = vec![0x23, 0x3a, 0xff];
    for program in 1..=8u16 {
        pat.extend_from_slice(&[0, program as u8, 0xe1, program as u8]);
        let name = format!("SERVICE {}", program);
        sdt.extend_from_slice(&[0, program as u8, 0xfe, 0x80, 0]);
        let loop_start = sdt.len();
        sdt.extend_from_slice(&[0x48, (5 + name.len()) as u8, 1, 2, b'P', b'P']);
        sdt.push(name.len() as u8);
        sdt.extend_from_slice(name.as_bytes());
        sdt[loop_start - 1] = (sdt.len() - loop_start) as u8;
    }
    packetize(&mut out, 0, &section(0x00, 1, &pat));
    for program in 1..=8u16 {
        let pmt = [0xe1, 0x01, 0xf0, 0, 0x1b, 0xe2, 0x01, 0xf0, 0, 0x0f, 0xe2, 0x02, 0xf0, 0];
        packetize(&mut out, 0x100 | program, &section(0x02, program, &pmt));
    }
    packetize(&mut out, 0x11, &section(0x42, 1, &sdt));
    packetize(&mut out, 0x11, &section(0x46, 2, &[0x23, 0x3a, 0xff]));
    for i in 0..200u16 {
        let service = i % 8 + 1;
        let mut eit = vec![0, 1, 0x23, 0x3a, 0, 0x4e];
        for e in 0..4u16 {
            let hour = ((i / 8) * 4 + e) % 24;
            let hour_bcd = (hour / 10 * 16 + hour % 10) as u8;
            eit.extend_from_slice(&[(i >> 8) as u8, e as u8, 0xc0, 0x79, hour_bcd, 0, 0]);
            eit.extend_from_slice(&[0x01, 0x00, 0x00, 0x80, 18]);
            eit.extend_from_slice(&[0x4d, 16, b'e', b'n', b'g', 9]);
            eit.extend_from_slice(b"SERVICE X");
            eit.extend_from_slice(&[2, b'h', b'i']);
        }
        packetize(&mut out, 0x12, &section(0x50, service, &eit));
    }
    out
}

fn session(c: &mut Criterion) {
    let buf = stream();
    let mut group = c.benchmark_group("session");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("catalog", |b| {
        b.iter(|| {
            let mut session = PsiSession::new().unwrap();
            let mut source = SlicePacketSource::new(&buf, PacketSize::Ts188);
            session.run(&mut source).unwrap();
            session.build_catalog()
        })
    });
    group.finish();
}

criterion_group!(benches, session);
criterion_main!(benches);
