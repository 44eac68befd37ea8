//! Types related to the _Program Association Table_

use super::table_status::{Admission, TableStatusTracker};
use super::{PsiError, Section};
use crate::demultiplex::{
    CompleteSection, FilterError, FilterId, FilterSpec, SectionDecoder, SectionFilterBank,
};
use crate::packet::Pid;
use log::debug;

/// The PAT is always carried in PID `0x0000`.
pub const PAT_PID: Pid = Pid::new(0x0000);
pub const PAT_TABLE_ID: u8 = 0x00;

// 3 byte common header, 5 byte syntax header and the CRC
const MIN_SECTION_LENGTH: usize = 8 + 4;
const ENTRY_SIZE: usize = 4;

/// One program listed by the PAT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatEntry {
    pub transport_stream_id: u16,
    pub program_number: u16,
    /// PID of the packets carrying this program's PMT
    pub program_map_pid: Pid,
}

impl PatEntry {
    /// panics if fewer than 4 bytes are provided
    fn from_bytes(transport_stream_id: u16, data: &[u8]) -> PatEntry {
        PatEntry {
            transport_stream_id,
            program_number: u16::from(data[0]) << 8 | u16::from(data[1]),
            program_map_pid: Pid::from_masked(u16::from(data[2]) << 8 | u16::from(data[3])),
        }
    }
}

/// Collects the entries of the _Program Association Table_.
#[derive(Debug, Default)]
pub struct PatDecoder {
    status: TableStatusTracker,
    entries: Vec<PatEntry>,
    complete: bool,
}

impl PatDecoder {
    pub fn new() -> PatDecoder {
        PatDecoder::default()
    }

    /// Registers the table status and allocates a filter for PAT sections.
    pub fn install(&mut self, bank: &mut SectionFilterBank) -> Result<FilterId, FilterError> {
        let id = bank.allocate(
            FilterSpec::pid(PAT_PID).table_id(PAT_TABLE_ID, 0xff),
            true,
            SectionDecoder::Pat,
        )?;
        self.status.register(PAT_PID, PAT_TABLE_ID);
        Ok(id)
    }

    /// Returns `Ok(true)` when this section completed the table, at which point the filter has
    /// been released and `program_map_pids()` gives the PIDs to watch for PMT sections.
    pub fn decode(
        &mut self,
        bank: &mut SectionFilterBank,
        section: &CompleteSection<'_>,
    ) -> Result<bool, PsiError> {
        let sect = Section::parse("PAT", section.data, MIN_SECTION_LENGTH)?;
        let table_id = sect.header.table_id;
        match self.status.admit(section.pid, table_id, &sect.syntax)? {
            Admission::Repeat => return Ok(false),
            Admission::Accepted {
                version_changed: true,
            } => self.entries.clear(),
            Admission::Accepted { .. } => (),
        }
        let transport_stream_id = sect.syntax.id();
        let body = sect.body(MIN_SECTION_LENGTH - 4);
        self.entries.extend(
            body.chunks_exact(ENTRY_SIZE)
                .map(|e| PatEntry::from_bytes(transport_stream_id, e))
                .filter(|e| e.program_number != 0),
        );

        let record_complete = self
            .status
            .find(section.pid, table_id)
            .map(|r| r.is_complete())
            .unwrap_or(false);
        if !record_complete {
            return Ok(false);
        }
        bank.release(section.filter);
        if !self.status.all_complete() {
            return Ok(false);
        }
        self.status.clear();
        if self.entries.is_empty() {
            return Err(PsiError::EmptyProgramAssociation);
        }
        debug!("PAT complete with {} programs", self.entries.len());
        self.complete = true;
        Ok(true)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Entries in the order they arrived.
    pub fn entries(&self) -> &[PatEntry] {
        &self.entries
    }

    /// The distinct `program_map_pid` values, in order of first appearance.
    pub fn program_map_pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = Vec::new();
        for e in &self.entries {
            if !pids.contains(&e.program_map_pid) {
                pids.push(e.program_map_pid);
            }
        }
        pids
    }

    /// Hands over the collected entries, leaving the decoder empty.
    pub fn take_entries(&mut self) -> Vec<PatEntry> {
        std::mem::take(&mut self.entries)
    }
}
