//! Types for processing tables of *Program Specific Information* and *Service Information* in a
//! transport stream.
//!
//! # Concepts
//!
//! * There are multiple standard types of table, like the *Program Association Table* and
//!   *Program Map Table* of _ISO/IEC 13818-1_, or the *Service Description Table* and *Event
//!   Information Table* of _ETSI EN 300 468_.
//! * A Table can split into *Sections*, numbered `0` to `last_section_number`.
//! * A Section can be split across a small number of individual transport stream *Packets*;
//!   the [`SectionFilterBank`](../demultiplex/struct.SectionFilterBank.html) puts them back
//!   together.
//! * A new `version_number` means the table content changed, and all of its sections must be
//!   collected again.  [`TableStatusTracker`](table_status/struct.TableStatusTracker.html) keeps
//!   account of this.
//!
//! The decoders for specific tables live in the submodules.

pub mod eit;
pub mod pat;
pub mod pmt;
pub mod sdt;
pub mod table_status;

use crate::demultiplex::FilterError;
use crate::mpegts_crc;
use crate::packet::Pid;
use thiserror::Error;

/// Errors returned by the table decoders to the dispatcher.  None of these stop the processing of
/// the stream; the section concerned is simply dropped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PsiError {
    /// The declared `section_length` (or the data actually supplied) is smaller than the fixed
    /// part of the section syntax for the table.
    #[error("{table} section of {actual} bytes is shorter than the minimum of {expected}")]
    SectionTooShort {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A section arrived for a table which was never registered with the `TableStatusTracker`,
    /// indicating a filter was installed without the matching status record.
    #[error("no table status registered for pid {pid} table_id {table_id:#04x}")]
    NoTableStatus { pid: Pid, table_id: u8 },
    #[error("section_number {section_number} exceeds last_section_number {last_section_number}")]
    SectionNumberOutOfRange {
        section_number: u8,
        last_section_number: u8,
    },
    /// A length field within the section body claims more bytes than remain before the CRC.
    #[error("{table} {field} of {length} bytes overruns the {available} remaining")]
    LengthOverrun {
        table: &'static str,
        field: &'static str,
        length: usize,
        available: usize,
    },
    /// A complete Program Association Table listed no programs.
    #[error("program association table holds no programs")]
    EmptyProgramAssociation,
    /// Installing a filter for a table discovered in this section failed.
    #[error("unable to install filter: {0}")]
    Filter(#[from] FilterError),
}

/// The three bytes at the start of every section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCommonHeader {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    pub private_indicator: bool,
    /// The 12-bit _section_length_ field: the number of bytes in the section which follow
    /// this header.
    pub section_length: usize,
}

impl SectionCommonHeader {
    /// The fixed size of the CommonSectionHeader data in the Transport Stream; 3 bytes.
    pub const SIZE: usize = 3;

    /// Returns `None` if the slice is shorter than `SectionCommonHeader::SIZE`.
    pub fn new(buf: &[u8]) -> Option<SectionCommonHeader> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(SectionCommonHeader {
            table_id: buf[0],
            section_syntax_indicator: buf[1] & 0b1000_0000 != 0,
            private_indicator: buf[1] & 0b0100_0000 != 0,
            section_length: ((u16::from(buf[1] & 0b0000_1111) << 8) | u16::from(buf[2])) as usize,
        })
    }

    /// The size of the whole section, header included.
    pub fn total_length(&self) -> usize {
        self.section_length + Self::SIZE
    }
}

/// Represents the fields that appear within table sections that use the common 'section syntax',
/// immediately after the `SectionCommonHeader`.
#[derive(Debug)]
pub struct TableSyntaxHeader<'buf> {
    buf: &'buf [u8],
}

impl<'buf> TableSyntaxHeader<'buf> {
    pub const SIZE: usize = 5;

    /// Returns `None` if the slice is shorter than `TableSyntaxHeader::SIZE`.
    pub fn new(buf: &'buf [u8]) -> Option<TableSyntaxHeader<'buf>> {
        if buf.len() < Self::SIZE {
            None
        } else {
            Some(TableSyntaxHeader { buf })
        }
    }
    /// The initial 16-bit field within a 'section syntax' table.  Known as
    ///  - `transport_stream_id` in a Program Association Section
    ///  - `program_number` in a Program Map Section
    ///  - `transport_stream_id` in a Service Description Section
    ///  - `service_id` in an Event Information Section
    pub fn id(&self) -> u16 {
        u16::from(self.buf[0]) << 8 | u16::from(self.buf[1])
    }
    /// A 5-bit value that changes whenever the content of the table changes.
    pub fn version(&self) -> u8 {
        (self.buf[2] >> 1) & 0b0001_1111
    }
    /// `true` if the table is applicable now, `false` if it becomes applicable at some future
    /// time.
    pub fn current_next_indicator(&self) -> bool {
        self.buf[2] & 1 != 0
    }
    /// The number of this section, within a potentially multi-section table.
    pub fn section_number(&self) -> u8 {
        self.buf[3]
    }
    /// The `section_number()` of the final section of the table.
    pub fn last_section_number(&self) -> u8 {
        self.buf[4]
    }
}

/// The parts of a complete section common to all tables using section syntax.
#[derive(Debug)]
pub struct Section<'buf> {
    pub header: SectionCommonHeader,
    pub syntax: TableSyntaxHeader<'buf>,
    /// The whole section, from `table_id` up to and including the `CRC_32` field, trimmed to the
    /// declared length.
    pub data: &'buf [u8],
}

impl<'buf> Section<'buf> {
    /// Checks that the section declares (and actually holds) at least `min_length` bytes, where
    /// `min_length` counts the 3 header bytes, the fixed fields of the table and the CRC.
    pub fn parse(
        table: &'static str,
        data: &'buf [u8],
        min_length: usize,
    ) -> Result<Section<'buf>, PsiError> {
        let too_short = |actual| PsiError::SectionTooShort {
            table,
            expected: min_length,
            actual,
        };
        let header = SectionCommonHeader::new(data).ok_or_else(|| too_short(data.len()))?;
        let total = header.total_length();
        if total < min_length {
            return Err(too_short(total));
        }
        if data.len() < total {
            return Err(too_short(data.len()));
        }
        let data = &data[..total];
        let syntax = TableSyntaxHeader::new(&data[SectionCommonHeader::SIZE..])
            .ok_or_else(|| too_short(total))?;
        Ok(Section {
            header,
            syntax,
            data,
        })
    }

    /// The bytes following the common header and the 5-byte table syntax header, up to the
    /// `CRC_32` field.
    pub fn body(&self, header_size: usize) -> &'buf [u8] {
        let end = self.data.len().saturating_sub(mpegts_crc::CRC_SIZE);
        &self.data[header_size.min(end)..end]
    }
}

/// The 3-bit _running_status_ of a service (in the SDT) or event (in the EIT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningStatus {
    Undefined,
    NotRunning,
    StartsInAFewSeconds,
    Pausing,
    Running,
    ServiceOffAir,
    Reserved(u8),
}

impl From<u8> for RunningStatus {
    fn from(val: u8) -> Self {
        match val & 0b111 {
            0 => RunningStatus::Undefined,
            1 => RunningStatus::NotRunning,
            2 => RunningStatus::StartsInAFewSeconds,
            3 => RunningStatus::Pausing,
            4 => RunningStatus::Running,
            5 => RunningStatus::ServiceOffAir,
            v => RunningStatus::Reserved(v),
        }
    }
}

/// Reads a 12-bit length field held in the low bits of two bytes.
pub(crate) fn length_12(buf: &[u8]) -> usize {
    usize::from(buf[0] & 0b0000_1111) << 8 | usize::from(buf[1])
}

/// Splits `len` bytes off the front of `buf`, failing with `PsiError::LengthOverrun` if fewer
/// remain.
pub(crate) fn take_field<'buf>(
    table: &'static str,
    field: &'static str,
    buf: &'buf [u8],
    len: usize,
) -> Result<(&'buf [u8], &'buf [u8]), PsiError> {
    if len > buf.len() {
        return Err(PsiError::LengthOverrun {
            table,
            field,
            length: len,
            available: buf.len(),
        });
    }
    Ok(buf.split_at(len))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn running_status() {
        assert_eq!(RunningStatus::from(4), RunningStatus::Running);
        assert_eq!(RunningStatus::from(0xe4), RunningStatus::Running);
        assert_eq!(RunningStatus::from(7), RunningStatus::Reserved(7));
    }

    #[test]
    fn overrunning_field() {
        assert_matches!(
            take_field("PMT", "ES_info", &[1, 2, 3], 4),
            Err(PsiError::LengthOverrun {
                length: 4,
                available: 3,
                ..
            })
        );
        let (field, rest) = take_field("PMT", "ES_info", &[1, 2, 3], 2).unwrap();
        assert_eq!(field, &[1, 2]);
        assert_eq!(rest, &[3]);
        assert_eq!(length_12(&[0xf1, 0x23]), 0x123);
    }

    #[test]
    fn common_header() {
        let hdr = SectionCommonHeader::new(&hex!("42f123")).unwrap();
        assert_eq!(hdr.table_id, 0x42);
        assert!(hdr.section_syntax_indicator);
        assert!(hdr.private_indicator);
        assert_eq!(hdr.section_length, 0x123);
        assert_eq!(hdr.total_length(), 0x126);
        assert!(SectionCommonHeader::new(&[0x42]).is_none());
    }

    #[test]
    fn syntax_header() {
        let syn = TableSyntaxHeader::new(&hex!("0001 cb 02 05")).unwrap();
        assert_eq!(syn.id(), 1);
        assert_eq!(syn.version(), 5);
        assert!(syn.current_next_indicator());
        assert_eq!(syn.section_number(), 2);
        assert_eq!(syn.last_section_number(), 5);
    }

    #[test]
    fn section_below_minimum() {
        // section_length 5 gives 8 bytes in total, less than the 12 required
        let data = hex!("00b005 0001 c1 00 00");
        assert_matches!(
            Section::parse("PAT", &data, 12),
            Err(PsiError::SectionTooShort {
                table: "PAT",
                expected: 12,
                actual: 8
            })
        );
    }

    #[test]
    fn section_truncated_data() {
        // declares 13 bytes, supplies 8
        let data = hex!("00b00a 0001 c1 00 00");
        assert_matches!(
            Section::parse("PAT", &data, 12),
            Err(PsiError::SectionTooShort { actual: 8, .. })
        );
    }

    #[test]
    fn section_trimmed_to_length() {
        let data = hex!("00b009 0001 c1 00 00 aabbccdd ffff");
        let sect = Section::parse("PAT", &data, 12).unwrap();
        assert_eq!(sect.data.len(), 12);
        assert!(sect.body(8).is_empty());
    }
}
