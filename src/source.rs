//! Supplies fixed-size packets to the [`SectionFilterBank`](../demultiplex/struct.SectionFilterBank.html).
//!
//! The bank only needs something implementing [`PacketSource`](trait.PacketSource.html).  Two
//! implementations are provided: one reading from any `std::io::Read`, and one walking an
//! in-memory slice.

use crate::packet::{Packet, PacketSize};
use log::debug;
use std::io;
use thiserror::Error;

/// Number of consecutive packets which must start with a sync byte for a candidate packet size
/// to be accepted.
pub const VALIDATION_DEPTH: usize = 10;

/// Number of bytes inspected by `ReadPacketSource::detect()` when looking for the packet size.
pub const PROBE_SIZE: usize = 64 * 1024;

/// A sequence of fixed-size packets, beginning at a valid sync position.
pub trait PacketSource {
    /// The size of every packet this source produces.
    fn packet_size(&self) -> PacketSize;

    /// Returns the next whole packet, or `None` once the stream is exhausted.  A trailing
    /// fragment shorter than `packet_size()` is discarded.
    fn read_next_packet(&mut self) -> io::Result<Option<&[u8]>>;
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("no run of {depth} sync bytes found at any candidate packet size")]
    NoSyncFound { depth: usize },
    #[error("error reading stream: {0}")]
    Io(#[from] io::Error),
}

/// Finds the packet size in use within `buf`, together with the offset of the first packet.
///
/// Each position holding a sync byte is tried in turn; a candidate size is accepted when the
/// `VALIDATION_DEPTH` following packets at that stride also start with a sync byte.  Candidates
/// are tried in the order 188, 192, 204.
pub fn detect_packet_size(buf: &[u8]) -> Result<(PacketSize, usize), DetectError> {
    for start in sync_positions(buf) {
        for size in PacketSize::CANDIDATES {
            let stride = size.len();
            let valid = (1..=VALIDATION_DEPTH).all(|k| {
                buf.get(start + k * stride)
                    .map(|&b| Packet::is_sync_byte(b))
                    .unwrap_or(false)
            });
            if valid {
                debug!("detected {} byte packets starting at offset {}", stride, start);
                return Ok((size, start));
            }
        }
    }
    Err(DetectError::NoSyncFound {
        depth: VALIDATION_DEPTH,
    })
}

fn sync_positions(buf: &[u8]) -> impl Iterator<Item = usize> + '_ {
    buf.iter()
        .enumerate()
        .filter_map(|(i, &b)| if Packet::is_sync_byte(b) { Some(i) } else { None })
}

/// Reads packets of a known size from an `io::Read` implementation.
pub struct ReadPacketSource<R: io::Read> {
    reader: R,
    size: PacketSize,
    pending: Vec<u8>,
    pending_pos: usize,
    buf: Vec<u8>,
}

impl<R: io::Read> ReadPacketSource<R> {
    /// The reader must already be positioned at the first sync byte.
    pub fn new(reader: R, size: PacketSize) -> ReadPacketSource<R> {
        ReadPacketSource {
            reader,
            size,
            pending: Vec::new(),
            pending_pos: 0,
            buf: vec![0; size.len()],
        }
    }

    /// Reads up to `PROBE_SIZE` bytes from the start of the stream to work out the packet size,
    /// then produces packets starting from the first sync position found.  Returns the source
    /// along with the offset of the first packet.
    pub fn detect(mut reader: R) -> Result<(ReadPacketSource<R>, usize), DetectError> {
        let mut probe = vec![0; PROBE_SIZE];
        let len = read_full(&mut reader, &mut probe)?;
        probe.truncate(len);
        let (size, start) = detect_packet_size(&probe)?;
        let mut source = ReadPacketSource::new(reader, size);
        source.pending = probe;
        source.pending_pos = start;
        Ok((source, start))
    }

    /// Gives back the wrapped reader, dropping any buffered data.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: io::Read> PacketSource for ReadPacketSource<R> {
    fn packet_size(&self) -> PacketSize {
        self.size
    }

    fn read_next_packet(&mut self) -> io::Result<Option<&[u8]>> {
        let mut filled = 0;
        if self.pending_pos < self.pending.len() {
            let avail = &self.pending[self.pending_pos..];
            let n = avail.len().min(self.buf.len());
            self.buf[..n].copy_from_slice(&avail[..n]);
            self.pending_pos += n;
            filled = n;
            if self.pending_pos == self.pending.len() {
                self.pending = Vec::new();
                self.pending_pos = 0;
            }
        }
        filled += read_full(&mut self.reader, &mut self.buf[filled..])?;
        if filled < self.buf.len() {
            Ok(None)
        } else {
            Ok(Some(&self.buf[..]))
        }
    }
}

fn read_full<R: io::Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Walks packets held in a byte slice.
pub struct SlicePacketSource<'buf> {
    data: &'buf [u8],
    size: PacketSize,
}

impl<'buf> SlicePacketSource<'buf> {
    pub fn new(data: &'buf [u8], size: PacketSize) -> SlicePacketSource<'buf> {
        SlicePacketSource { data, size }
    }
}

impl<'buf> PacketSource for SlicePacketSource<'buf> {
    fn packet_size(&self) -> PacketSize {
        self.size
    }

    fn read_next_packet(&mut self) -> io::Result<Option<&[u8]>> {
        let len = self.size.len();
        if self.data.len() < len {
            self.data = &self.data[self.data.len()..];
            return Ok(None);
        }
        let (pk, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(Some(pk))
    }
}
