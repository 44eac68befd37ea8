//! Copies the packets of selected PIDs from a source to a writer, for example to save one program
//! from a multi-program stream.

use crate::packet::{Packet, Pid};
use crate::source::PacketSource;
use log::{debug, warn};
use std::io;

/// Writes every packet whose PID is listed in `pids` to `writer`, unchanged and at its full
/// stored size.  Returns the number of packets written.
///
/// Packets lacking a sync byte are skipped.
pub fn extract_pids<S, W>(source: &mut S, writer: &mut W, pids: &[Pid]) -> io::Result<usize>
where
    S: PacketSource,
    W: io::Write,
{
    let mut count = 0;
    let mut skipped = 0;
    while let Some(buf) = source.read_next_packet()? {
        let Some(pk) = Packet::try_new(buf) else {
            skipped += 1;
            continue;
        };
        if pids.contains(&pk.pid()) {
            writer.write_all(buf)?;
            count += 1;
        }
    }
    if skipped > 0 {
        warn!("{} packets without sync byte skipped", skipped);
    }
    writer.flush()?;
    debug!("extracted {} packets for {} PIDs", count, pids.len());
    Ok(count)
}
