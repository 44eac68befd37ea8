//! Types related to the _Program Map Table_

use super::table_status::{Admission, TableStatusTracker};
use super::{length_12, take_field, PsiError, Section};
use crate::demultiplex::{
    CompleteSection, FilterId, FilterSpec, SectionDecoder, SectionFilterBank,
};
use crate::descriptor::subtitling::SubtitlingEntry;
use crate::descriptor::{DescriptorError, DescriptorIter, DvbDescriptors};
use crate::packet::Pid;
use crate::StreamType;
use log::{debug, warn};

pub const PMT_TABLE_ID: u8 = 0x02;

/// Private data specifier descriptors retained per descriptor loop.
pub const MAX_PRIVATE_DATA_SPECIFIER_COUNT: usize = 8;
/// Subtitling descriptors retained per descriptor loop.
pub const MAX_SUBTITLING_DESCRIPTOR_COUNT: usize = 8;
/// Entries retained per subtitling descriptor.
pub const MAX_SUBTITLING_INFO_COUNT: usize = 8;

// common header, syntax header, PCR_PID and program_info_length
const HEADER_SIZE: usize = 12;
const MIN_SECTION_LENGTH: usize = HEADER_SIZE + 4;
const STREAM_HEADER_SIZE: usize = 5;

/// The descriptors of a PMT descriptor loop which this crate retains.  Others are skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorSet {
    pub private_data_specifiers: Vec<u32>,
    /// One list of entries per _subtitling_descriptor_
    pub subtitling: Vec<Vec<SubtitlingEntry>>,
}

impl DescriptorSet {
    fn parse(buf: &[u8]) -> DescriptorSet {
        let mut set = DescriptorSet::default();
        for desc in DescriptorIter::<DvbDescriptors<'_>>::new(buf) {
            match desc {
                Ok(DvbDescriptors::PrivateDataSpecifier(pds)) => {
                    if set.private_data_specifiers.len() < MAX_PRIVATE_DATA_SPECIFIER_COUNT {
                        set.private_data_specifiers
                            .push(pds.private_data_specifier());
                    } else {
                        warn!(
                            "more than {} private_data_specifier_descriptors, dropping {:#010x}",
                            MAX_PRIVATE_DATA_SPECIFIER_COUNT,
                            pds.private_data_specifier()
                        );
                    }
                }
                Ok(DvbDescriptors::Subtitling(sub)) => {
                    if set.subtitling.len() >= MAX_SUBTITLING_DESCRIPTOR_COUNT {
                        warn!(
                            "more than {} subtitling_descriptors, dropping {:?}",
                            MAX_SUBTITLING_DESCRIPTOR_COUNT, sub
                        );
                        continue;
                    }
                    let entries: Vec<_> = sub.entries().collect();
                    if entries.len() > MAX_SUBTITLING_INFO_COUNT {
                        warn!(
                            "subtitling_descriptor has {} entries, keeping the first {}",
                            entries.len(),
                            MAX_SUBTITLING_INFO_COUNT
                        );
                    }
                    set.subtitling
                        .push(entries.into_iter().take(MAX_SUBTITLING_INFO_COUNT).collect());
                }
                Ok(_) | Err(DescriptorError::UnhandledTagValue(_)) => (),
                Err(e) => warn!("PMT descriptor skipped: {}", e),
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.private_data_specifiers.is_empty() && self.subtitling.is_empty()
    }
}

/// Details of a particular elementary stream within a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementaryStream {
    pub stream_type: StreamType,
    /// The Pid that will be used for TS packets containing the data of this stream
    pub elementary_pid: Pid,
    pub descriptors: DescriptorSet,
}

/// A decoded PMT section: one program, and the elementary streams it is composed of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PmtProgram {
    pub program_number: u16,
    /// PID of the packets that will contain the Program Clock Reference for this program
    pub pcr_pid: Pid,
    pub descriptors: DescriptorSet,
    /// Streams in the order they are listed in the section
    pub streams: Vec<ElementaryStream>,
}

impl PmtProgram {
    fn parse(sect: &Section<'_>) -> Result<PmtProgram, PsiError> {
        let data = sect.data;
        let pcr_pid = Pid::from_masked(u16::from(data[8]) << 8 | u16::from(data[9]));
        let program_info_length = length_12(&data[10..12]);
        let (program_info, mut rest) = take_field(
            "PMT",
            "program_info",
            sect.body(HEADER_SIZE),
            program_info_length,
        )?;
        let mut streams = Vec::new();
        while !rest.is_empty() {
            let (header, tail) = take_field("PMT", "stream header", rest, STREAM_HEADER_SIZE)?;
            let (es_info, tail) = take_field("PMT", "ES_info", tail, length_12(&header[3..5]))?;
            streams.push(ElementaryStream {
                stream_type: StreamType::from(header[0]),
                elementary_pid: Pid::from_masked(u16::from(header[1]) << 8 | u16::from(header[2])),
                descriptors: DescriptorSet::parse(es_info),
            });
            rest = tail;
        }
        Ok(PmtProgram {
            program_number: sect.syntax.id(),
            pcr_pid,
            descriptors: DescriptorSet::parse(program_info),
            streams,
        })
    }
}

/// Collects the _Program Map Table_ sections of every program listed by the PAT.
#[derive(Debug, Default)]
pub struct PmtDecoder {
    status: TableStatusTracker,
    filters: Vec<FilterId>,
    programs: Vec<PmtProgram>,
    complete: bool,
}

impl PmtDecoder {
    pub fn new() -> PmtDecoder {
        PmtDecoder::default()
    }

    /// Installs one filter per distinct PID given, registering a table status for each.
    ///
    /// Stops at the first filter which cannot be allocated, leaving those already installed in
    /// place.
    pub fn install(&mut self, bank: &mut SectionFilterBank, pids: &[Pid]) -> Result<(), PsiError> {
        for &pid in pids {
            if self.status.exists(pid, PMT_TABLE_ID) {
                continue;
            }
            let id = bank.allocate(
                FilterSpec::pid(pid).table_id(PMT_TABLE_ID, 0xff),
                true,
                SectionDecoder::Pmt,
            )?;
            self.filters.push(id);
            self.status.register(pid, PMT_TABLE_ID);
        }
        Ok(())
    }

    /// Returns `Ok(true)` once the sections of every PMT have been received, at which point all
    /// PMT filters have been released.
    pub fn decode(
        &mut self,
        bank: &mut SectionFilterBank,
        section: &CompleteSection<'_>,
    ) -> Result<bool, PsiError> {
        let sect = Section::parse("PMT", section.data, MIN_SECTION_LENGTH)?;
        let program = PmtProgram::parse(&sect)?;
        let table_id = sect.header.table_id;
        match self.status.admit(section.pid, table_id, &sect.syntax)? {
            Admission::Repeat => return Ok(false),
            Admission::Accepted {
                version_changed: true,
            } => self
                .programs
                .retain(|p| p.program_number != program.program_number),
            Admission::Accepted { .. } => (),
        }
        self.insert(program);

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
        for id in self.filters.drain(..) {
            bank.release(id);
        }
        self.status.clear();
        debug!("PMT complete for {} programs", self.programs.len());
        self.complete = true;
        Ok(true)
    }

    fn insert(&mut self, program: PmtProgram) {
        let pos = self
            .programs
            .partition_point(|p| p.program_number <= program.program_number);
        self.programs.insert(pos, program);
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Programs in ascending `program_number` order.
    pub fn programs(&self) -> &[PmtProgram] {
        &self.programs
    }

    pub fn take_programs(&mut self) -> Vec<PmtProgram> {
        std::mem::take(&mut self.programs)
    }
}
