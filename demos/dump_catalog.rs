//! Prints the programs, services and events found in a transport stream file.
//!
//! ```text
//! cargo run --example dump_catalog -- capture.ts [program_number output.ts]
//! ```
//!
//! Given a program number and output file, the packets of that program's PCR and elementary
//! streams are also copied to the output.

use mpeg2ts_catalog::catalog::{find_by_program_number, ProgramInfo};
use mpeg2ts_catalog::extract::extract_pids;
use mpeg2ts_catalog::session::PsiSession;
use mpeg2ts_catalog::source::{PacketSource, ReadPacketSource};
use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};

fn print_program(p: &ProgramInfo) {
    println!(
        "program {} ({}) tsid {:#06x} onid {:#06x} pcr {:?}",
        p.program_number, p.service_name, p.transport_stream_id, p.original_network_id, p.pcr_pid
    );
    println!(
        "  provider {:?} service_type {:#04x}",
        p.provider_name, p.service_type
    );
    for s in &p.streams {
        println!("  {:?} {:?}", s.elementary_pid, s.stream_type);
    }
    for e in &p.events {
        let name = e
            .short_events
            .first()
            .map(|s| s.event_name.as_str())
            .unwrap_or("");
        println!(
            "  event {} {} {}s {:?}",
            e.event_id,
            e.start_time_utc(),
            e.duration_seconds(),
            name
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let mut args = env::args().skip(1);
    let name = args
        .next()
        .ok_or("usage: dump_catalog <file.ts> [program_number output.ts]")?;
    let selected = match (args.next(), args.next()) {
        (Some(n), Some(out)) => Some((n.parse::<u16>()?, out)),
        _ => None,
    };

    let f = BufReader::new(File::open(&name)?);
    let (mut source, offset) = ReadPacketSource::detect(f)?;
    println!("{:?} packets from offset {}", source.packet_size(), offset);
    let mut session = PsiSession::new()?;
    session.run(&mut source)?;
    if !session.is_channel_complete() {
        println!("warning: PMT or SDT incomplete");
    }
    let catalog = session.build_catalog();
    for p in &catalog {
        print_program(p);
    }

    if let Some((program_number, out)) = selected {
        let program = find_by_program_number(&catalog, program_number)
            .ok_or_else(|| format!("no program {}", program_number))?;
        let f = BufReader::new(File::open(&name)?);
        let (mut source, _) = ReadPacketSource::detect(f)?;
        let mut w = BufWriter::new(File::create(&out)?);
        let count = extract_pids(&mut source, &mut w, &program.pids())?;
        println!("{} packets written to {}", count, out);
    }
    Ok(())
}

