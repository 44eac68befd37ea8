//! The [`SectionFilterBank`](struct.SectionFilterBank.html) selects the packets carrying tables
//! of interest, reassembles their sections, and hands each complete section to a
//! [`SectionProcessor`](trait.SectionProcessor.html).
//!
//! Packets are selected by a set of filters, each a 16 byte match pattern with a mask.  The
//! first 4 bytes are compared against the packet header (so selecting a PID), and the remaining
//! 12 against the start of any section beginning within the packet (so selecting a `table_id`, or
//! a range of them).

use crate::mpegts_crc;
use crate::packet::{Packet, Pid, FIXED_HEADER_SIZE};
use crate::psi::{PsiError, SectionCommonHeader};
use crate::source::PacketSource;
use log::{debug, trace, warn};
use std::fmt;
use std::io;
use std::mem;
use thiserror::Error;

/// The number of filters a `SectionFilterBank` can hold at once.
pub const MAX_FILTER_COUNT: usize = 32;

/// Sections declaring a greater length than this are dropped rather than reassembled.
pub const MAX_SECTION_LENGTH: usize = 4096;

/// Size of the match pattern and mask of a `FilterSpec`.
pub const FILTER_DEPTH: usize = 16;

/// The table decoder that completed sections from a filter are dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionDecoder {
    Pat,
    Pmt,
    Sdt,
    Eit,
}

/// Identifies a filter allocated within a `SectionFilterBank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(usize);

impl FilterId {
    /// Position of the filter within the bank.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    /// Every filter in the bank is already in use.
    #[error("no free filter slot, all {} in use", MAX_FILTER_COUNT)]
    NoSlotAvailable,
}

/// A pattern and mask selecting packets by header and sections by header.
///
/// Bytes `0..4` apply to the 4-byte packet header; bytes `4..16` apply to the first 12 bytes of a
/// section.  Only bits set in the mask are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub pattern: [u8; FILTER_DEPTH],
    pub mask: [u8; FILTER_DEPTH],
}

impl FilterSpec {
    /// Matches packets with the given PID (and a valid sync byte), and any section.
    pub const fn pid(pid: Pid) -> FilterSpec {
        let val = pid.value();
        let mut pattern = [0; FILTER_DEPTH];
        let mut mask = [0; FILTER_DEPTH];
        pattern[0] = Packet::SYNC_BYTE;
        mask[0] = 0xff;
        pattern[1] = (val >> 8) as u8 & 0b0001_1111;
        mask[1] = 0b0001_1111;
        pattern[2] = val as u8;
        mask[2] = 0xff;
        FilterSpec { pattern, mask }
    }

    /// Additionally requires `table_id & mask == id & mask`.
    pub const fn table_id(mut self, id: u8, mask: u8) -> FilterSpec {
        self.pattern[FIXED_HEADER_SIZE] = id;
        self.mask[FIXED_HEADER_SIZE] = mask;
        self
    }

    fn matches(pattern: &[u8], mask: &[u8], data: &[u8], partial: bool) -> bool {
        for (i, (p, m)) in pattern.iter().zip(mask).enumerate() {
            if *m == 0 {
                continue;
            }
            match data.get(i) {
                Some(b) if b & m == p & m => {}
                None if partial => return true,
                _ => return false,
            }
        }
        true
    }

    /// Compares the 4 byte packet header.
    pub fn matches_packet_header(&self, packet: &[u8]) -> bool {
        Self::matches(
            &self.pattern[..FIXED_HEADER_SIZE],
            &self.mask[..FIXED_HEADER_SIZE],
            packet,
            false,
        )
    }

    /// Compares the start of a section.  A masked byte beyond the end of `section` never
    /// matches.
    pub fn matches_section_header(&self, section: &[u8]) -> bool {
        Self::matches(
            &self.pattern[FIXED_HEADER_SIZE..],
            &self.mask[FIXED_HEADER_SIZE..],
            section,
            false,
        )
    }

    /// Compares as much of the start of a section as is available so far.
    pub fn matches_section_prefix(&self, prefix: &[u8]) -> bool {
        Self::matches(
            &self.pattern[FIXED_HEADER_SIZE..],
            &self.mask[FIXED_HEADER_SIZE..],
            prefix,
            true,
        )
    }
}

/// A section that has been completely reassembled, and passed its CRC check where one was
/// required.
#[derive(Debug)]
pub struct CompleteSection<'buf> {
    pub filter: FilterId,
    pub decoder: SectionDecoder,
    /// PID of the packets which carried the section
    pub pid: Pid,
    /// The whole section, from `table_id` to the end of the `CRC_32`
    pub data: &'buf [u8],
}

/// Receives the sections completed by a `SectionFilterBank`.
///
/// The bank itself is passed back in so that the processor can allocate and release filters
/// as tables are found and completed.  Errors returned are logged by the bank, and do not stop
/// processing of the stream.
pub trait SectionProcessor {
    fn section(
        &mut self,
        bank: &mut SectionFilterBank,
        section: CompleteSection<'_>,
    ) -> Result<(), PsiError>;
}

struct Filter {
    spec: FilterSpec,
    crc_required: bool,
    decoder: SectionDecoder,
    buf: Vec<u8>,
    /// Total length of the section in progress, known once its first 3 bytes have arrived
    section_length: Option<usize>,
    in_progress: bool,
}

impl Filter {
    fn new(spec: FilterSpec, crc_required: bool, decoder: SectionDecoder) -> Filter {
        Filter {
            spec,
            crc_required,
            decoder,
            buf: Vec::new(),
            section_length: None,
            in_progress: false,
        }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.section_length = None;
        self.in_progress = false;
    }

    fn begin(&mut self) {
        self.buf.clear();
        self.section_length = None;
        self.in_progress = true;
    }

    /// Adds bytes to the section in progress.  Returns `false`, leaving the filter reset, once
    /// the bytes gathered so far show that the section does not match the filter or is too
    /// long.
    fn append(&mut self, pid: Pid, data: &[u8]) -> bool {
        let mut data = data;
        let total = match self.section_length {
            Some(total) => total,
            None => {
                let n = data.len().min(SectionCommonHeader::SIZE - self.buf.len());
                self.buf.extend_from_slice(&data[..n]);
                data = &data[n..];
                if !self.spec.matches_section_prefix(&self.buf) {
                    self.reset();
                    return false;
                }
                let Some(header) = SectionCommonHeader::new(&self.buf) else {
                    // the rest of the header follows in the next packet
                    return true;
                };
                let total = header.total_length();
                if total > MAX_SECTION_LENGTH {
                    warn!(
                        "{:?}: section of {} bytes for table_id {:#04x} exceeds limit of {}",
                        pid, total, header.table_id, MAX_SECTION_LENGTH
                    );
                    self.reset();
                    return false;
                }
                self.section_length = Some(total);
                total
            }
        };
        let n = data.len().min(total.saturating_sub(self.buf.len()));
        self.buf.extend_from_slice(&data[..n]);
        let matched = if self.buf.len() >= total {
            self.spec.matches_section_header(&self.buf)
        } else {
            self.spec.matches_section_prefix(&self.buf)
        };
        if !matched {
            self.reset();
        }
        matched
    }

    fn is_complete(&self) -> bool {
        self.in_progress && matches!(self.section_length, Some(len) if self.buf.len() >= len)
    }

    /// When a new section starts part way through a packet, the bytes before the
    /// `pointer_field` target may finish off a section already in progress.
    fn feed_tail(&mut self, pk: &Packet<'_>) -> bool {
        if !self.in_progress
            || !pk.payload_unit_start_indicator()
            || !self.spec.matches_packet_header(pk.buffer())
        {
            return false;
        }
        let Some(offset) = pk.payload_offset() else {
            return false;
        };
        let buf = pk.buffer();
        let pointer = buf[offset] as usize;
        let end = (offset + 1 + pointer).min(Packet::SIZE);
        if !self.append(pk.pid(), &buf[offset + 1..end]) {
            return false;
        }
        if self.is_complete() {
            true
        } else {
            debug!(
                "{:?}: section abandoned after {} of {:?} bytes",
                pk.pid(),
                self.buf.len(),
                self.section_length
            );
            self.reset();
            false
        }
    }

    /// Returns `true` if the section being reassembled is now complete.
    fn feed(&mut self, pk: &Packet<'_>) -> bool {
        let buf = pk.buffer();
        if !self.spec.matches_packet_header(buf) {
            return false;
        }
        let Some(offset) = pk.payload_offset() else {
            return false;
        };
        let start = if pk.payload_unit_start_indicator() {
            let pointer = buf[offset] as usize;
            let start = offset + 1 + pointer;
            if start >= Packet::SIZE {
                warn!("{:?}: pointer_field {} beyond end of packet", pk.pid(), pointer);
                self.reset();
                return false;
            }
            self.begin();
            start
        } else if self.in_progress {
            offset
        } else {
            return false;
        };
        self.append(pk.pid(), &buf[start..]) && self.is_complete()
    }
}

/// A fixed-size pool of filters, fed with packets from a `PacketSource`.
pub struct SectionFilterBank {
    slots: Vec<Option<Filter>>,
}

impl fmt::Debug for SectionFilterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionFilterBank")
            .field("active_count", &self.active_count())
            .finish()
    }
}

impl Default for SectionFilterBank {
    fn default() -> Self {
        SectionFilterBank::new()
    }
}

impl SectionFilterBank {
    pub fn new() -> SectionFilterBank {
        SectionFilterBank {
            slots: (0..MAX_FILTER_COUNT).map(|_| None).collect(),
        }
    }

    /// Installs a filter in the first free slot.
    pub fn allocate(
        &mut self,
        spec: FilterSpec,
        crc_required: bool,
        decoder: SectionDecoder,
    ) -> Result<FilterId, FilterError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FilterError::NoSlotAvailable)?;
        self.slots[index] = Some(Filter::new(spec, crc_required, decoder));
        debug!("filter {} allocated for {:?}", index, decoder);
        Ok(FilterId(index))
    }

    /// Frees the given filter, discarding any partly reassembled section.  Releasing a filter
    /// that is not allocated has no effect.
    pub fn release(&mut self, id: FilterId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if slot.take().is_some() {
                debug!("filter {} released", id.0);
            }
        }
    }

    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    pub fn is_allocated(&self, id: FilterId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Number of filters currently allocated.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Consumes packets from the source until it is exhausted, or until no filters remain.
    pub fn run<S, P>(&mut self, source: &mut S, processor: &mut P) -> io::Result<()>
    where
        S: PacketSource,
        P: SectionProcessor,
    {
        while let Some(pk) = source.read_next_packet()? {
            self.push_packet(pk, processor);
            if self.active_count() == 0 {
                debug!("no filters remain, stopping");
                break;
            }
        }
        Ok(())
    }

    /// Offers one packet to every allocated filter, dispatching any sections it completes.
    pub fn push_packet<P: SectionProcessor>(&mut self, buf: &[u8], processor: &mut P) {
        let Some(pk) = Packet::try_new(buf) else {
            warn!("packet without sync byte skipped");
            return;
        };
        for index in 0..self.slots.len() {
            let tail_done = match self.slots[index].as_mut() {
                Some(filter) => filter.feed_tail(&pk),
                None => continue,
            };
            if tail_done {
                self.complete(index, pk.pid(), processor);
            }
            let done = match self.slots[index].as_mut() {
                Some(filter) => filter.feed(&pk),
                None => continue,
            };
            if done {
                self.complete(index, pk.pid(), processor);
            }
        }
    }

    fn complete<P: SectionProcessor>(&mut self, index: usize, pid: Pid, processor: &mut P) {
        let Some(filter) = self.slots[index].as_mut() else {
            return;
        };
        let mut data = mem::take(&mut filter.buf);
        let decoder = filter.decoder;
        let crc_required = filter.crc_required;
        filter.reset();

        // don't apply CRC checks when fuzzing, to give more chances of test data triggering
        // parser bugs,
        if crc_required && !cfg!(fuzz) && !mpegts_crc::check(&data) {
            warn!(
                "{:?}: section crc check failed for table_id {:#04x}",
                pid, data[0]
            );
        } else {
            trace!("{:?}: {} byte section to {:?}", pid, data.len(), decoder);
            let section = CompleteSection {
                filter: FilterId(index),
                decoder,
                pid,
                data: &data,
            };
            if let Err(e) = processor.section(self, section) {
                warn!("{:?}: {:?} section dropped: {}", pid, decoder, e);
            }
        }

        data.clear();
        if let Some(filter) = self.slots[index].as_mut() {
            if !filter.in_progress && filter.buf.capacity() == 0 {
                filter.buf = data;
            }
        }
    }
}
