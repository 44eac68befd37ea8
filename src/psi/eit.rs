//! Types related to the _Event Information Table_ of _ETSI EN 300 468_, which carries the
//! electronic programme guide.
//!
//! Unlike the other tables, EIT content is not collected version by version.  Events are kept for
//! as long as the stream is read, and a newly received event replaces any earlier event of the
//! same service whose start or end falls within the new event's time span.

use super::{PsiError, RunningStatus, Section};
use crate::demultiplex::{
    CompleteSection, FilterError, FilterId, FilterSpec, SectionDecoder, SectionFilterBank,
};
use crate::descriptor::event::{
    ExtendedEventDescriptor, ShortEventDescriptor, TimeShiftedEventDescriptor,
};
use crate::descriptor::{DescriptorError, DescriptorIter, DvbDescriptors, LanguageCode};
use crate::packet::Pid;
use log::{trace, warn};
use std::fmt;

pub const EIT_PID: Pid = Pid::new(0x0012);

/// `(table_id, mask)` pairs of the EIT filters: present/following for the actual and other
/// transport streams (`0x4e`, `0x4f`), then schedule for the actual (`0x50..=0x5f`) and other
/// (`0x60..=0x6f`) transport streams.
pub const EIT_TABLE_IDS: [(u8, u8); 3] = [(0x4e, 0xfe), (0x50, 0xf0), (0x60, 0xf0)];

// common header, syntax header, transport_stream_id, original_network_id,
// segment_last_section_number and last_table_id
const HEADER_SIZE: usize = 14;
const MIN_SECTION_LENGTH: usize = HEADER_SIZE + 4;
const EVENT_HEADER_SIZE: usize = 12;

/// A UTC date and time, decoded from the 40-bit MJD + BCD form used by DVB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UtcTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl UtcTime {
    /// Decodes the low 40 bits of `raw`: a 16-bit Modified Julian Date followed by six 4-bit BCD
    /// digits giving hours, minutes and seconds.
    pub fn from_raw(raw: u64) -> UtcTime {
        let (year, month, day) = civil_from_mjd(mjd(raw));
        let (hour, minute, second) = bcd_hms((raw & 0xff_ffff) as u32);
        UtcTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

fn mjd(raw: u64) -> u16 {
    (raw >> 24) as u16
}

fn bcd(b: u8) -> u8 {
    (b >> 4) * 10 + (b & 0x0f)
}

fn bcd_hms(raw: u32) -> (u8, u8, u8) {
    (
        bcd((raw >> 16) as u8),
        bcd((raw >> 8) as u8),
        bcd(raw as u8),
    )
}

// days-to-civil conversion, counting from the MJD epoch of 1858-11-17
fn civil_from_mjd(mjd: u16) -> (i32, u8, u8) {
    let z = i64::from(mjd) - 40_587 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month as u8, day as u8)
}

/// Converts a 24-bit BCD `hhmmss` duration into seconds.
pub fn duration_seconds(raw: u32) -> u32 {
    let (h, m, s) = bcd_hms(raw);
    u32::from(h) * 3600 + u32::from(m) * 60 + u32::from(s)
}

/// Converts a 40-bit MJD + BCD start time into seconds since the MJD epoch.
pub fn start_seconds(raw: u64) -> u64 {
    let (h, m, s) = bcd_hms((raw & 0xff_ffff) as u32);
    u64::from(mjd(raw)) * 86_400 + u64::from(h) * 3600 + u64::from(m) * 60 + u64::from(s)
}

/// Content of a _short_event_descriptor_.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortEvent {
    pub language: LanguageCode,
    pub event_name: String,
    pub text: String,
}

impl<'buf> From<&ShortEventDescriptor<'buf>> for ShortEvent {
    fn from(d: &ShortEventDescriptor<'buf>) -> Self {
        ShortEvent {
            language: d.language(),
            event_name: d.event_name(),
            text: d.text(),
        }
    }
}

/// Content of an _extended_event_descriptor_.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedEvent {
    pub descriptor_number: u8,
    pub last_descriptor_number: u8,
    pub language: LanguageCode,
    /// The undecoded item loop
    pub items: Vec<u8>,
    pub text: String,
}

impl<'buf> From<&ExtendedEventDescriptor<'buf>> for ExtendedEvent {
    fn from(d: &ExtendedEventDescriptor<'buf>) -> Self {
        ExtendedEvent {
            descriptor_number: d.descriptor_number(),
            last_descriptor_number: d.last_descriptor_number(),
            language: d.language(),
            items: d.items().to_vec(),
            text: d.text(),
        }
    }
}

/// Content of a _time_shifted_event_descriptor_.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeShiftedEvent {
    pub reference_service_id: u16,
    pub reference_event_id: u16,
}

impl<'buf> From<&TimeShiftedEventDescriptor<'buf>> for TimeShiftedEvent {
    fn from(d: &TimeShiftedEventDescriptor<'buf>) -> Self {
        TimeShiftedEvent {
            reference_service_id: d.reference_service_id(),
            reference_event_id: d.reference_event_id(),
        }
    }
}

/// One event of an EIT section, along with the identifiers of the service it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EitEvent {
    pub service_id: u16,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub segment_last_section_number: u8,
    pub last_table_id: u8,
    pub event_id: u16,
    /// 40-bit MJD + BCD encoded UTC start time; see `UtcTime::from_raw()`
    pub start_time: u64,
    /// 24-bit BCD encoded `hhmmss`; see `duration_seconds()`
    pub duration: u32,
    pub running_status: RunningStatus,
    pub free_ca_mode: bool,
    pub short_events: Vec<ShortEvent>,
    pub extended_events: Vec<ExtendedEvent>,
    pub time_shifted_events: Vec<TimeShiftedEvent>,
}

impl EitEvent {
    fn same_service(&self, other: &EitEvent) -> bool {
        self.service_id == other.service_id
            && self.transport_stream_id == other.transport_stream_id
            && self.original_network_id == other.original_network_id
    }

    fn sort_key(&self) -> (u16, u16, u16, u64) {
        (
            self.service_id,
            self.transport_stream_id,
            self.original_network_id,
            self.start_time,
        )
    }

    /// Start and end of the event, in seconds since the MJD epoch.
    pub fn interval(&self) -> (u64, u64) {
        let start = start_seconds(self.start_time);
        (start, start + u64::from(duration_seconds(self.duration)))
    }

    fn add_descriptors(&mut self, buf: &[u8]) {
        for desc in DescriptorIter::<DvbDescriptors<'_>>::new(buf) {
            match desc {
                Ok(DvbDescriptors::ShortEvent(d)) => {
                    let short = ShortEvent::from(&d);
                    if !self.short_events.contains(&short) {
                        self.short_events.push(short);
                    }
                }
                Ok(DvbDescriptors::ExtendedEvent(d)) => {
                    self.extended_events.push(ExtendedEvent::from(&d))
                }
                Ok(DvbDescriptors::TimeShiftedEvent(d)) => {
                    self.time_shifted_events.push(TimeShiftedEvent::from(&d))
                }
                Ok(_) | Err(DescriptorError::UnhandledTagValue(_)) => (),
                Err(e) => warn!("EIT descriptor skipped: {}", e),
            }
        }
    }
}

struct EventIter<'buf> {
    sect: &'buf [u8],
    buf: &'buf [u8],
}

impl<'buf> Iterator for EventIter<'buf> {
    type Item = EitEvent;

    fn next(&mut self) -> Option<EitEvent> {
        if self.buf.len() < EVENT_HEADER_SIZE {
            if !self.buf.is_empty() {
                warn!(
                    "EIT: {} trailing bytes too few for an event",
                    self.buf.len()
                );
            }
            return None;
        }
        let (header, rest) = self.buf.split_at(EVENT_HEADER_SIZE);
        let mut loop_len = usize::from(header[10] & 0x0f) << 8 | usize::from(header[11]);
        if loop_len > rest.len() {
            warn!(
                "EIT: descriptors_loop_length {} exceeds {} remaining bytes",
                loop_len,
                rest.len()
            );
            loop_len = rest.len();
        }
        let (descriptors, rest) = rest.split_at(loop_len);
        self.buf = rest;

        let s = self.sect;
        let mut event = EitEvent {
            service_id: u16::from(s[3]) << 8 | u16::from(s[4]),
            transport_stream_id: u16::from(s[8]) << 8 | u16::from(s[9]),
            original_network_id: u16::from(s[10]) << 8 | u16::from(s[11]),
            segment_last_section_number: s[12],
            last_table_id: s[13],
            event_id: u16::from(header[0]) << 8 | u16::from(header[1]),
            start_time: header[2..7]
                .iter()
                .fold(0u64, |acc, &b| acc << 8 | u64::from(b)),
            duration: header[7..10]
                .iter()
                .fold(0u32, |acc, &b| acc << 8 | u32::from(b)),
            running_status: RunningStatus::from(header[10] >> 5),
            free_ca_mode: header[10] & 0b0001_0000 != 0,
            short_events: Vec::new(),
            extended_events: Vec::new(),
            time_shifted_events: Vec::new(),
        };
        event.add_descriptors(descriptors);
        Some(event)
    }
}

/// Accumulates EIT events for every service, across all EIT table ids.
#[derive(Debug, Default)]
pub struct EitDecoder {
    filters: Vec<FilterId>,
    events: Vec<EitEvent>,
}

impl EitDecoder {
    pub fn new() -> EitDecoder {
        EitDecoder::default()
    }

    /// Installs the three filters covering the present/following and schedule table ids.
    pub fn install(&mut self, bank: &mut SectionFilterBank) -> Result<(), FilterError> {
        for (table_id, mask) in EIT_TABLE_IDS {
            let id = bank.allocate(
                FilterSpec::pid(EIT_PID).table_id(table_id, mask),
                true,
                SectionDecoder::Eit,
            )?;
            self.filters.push(id);
        }
        Ok(())
    }

    /// Stops collecting events.
    pub fn release(&mut self, bank: &mut SectionFilterBank) {
        for id in self.filters.drain(..) {
            bank.release(id);
        }
    }

    /// Adds the events of the section, returning how many there were.
    pub fn decode(&mut self, section: &CompleteSection<'_>) -> Result<usize, PsiError> {
        let sect = Section::parse("EIT", section.data, MIN_SECTION_LENGTH)?;
        let events = EventIter {
            sect: sect.data,
            buf: sect.body(HEADER_SIZE),
        };
        let mut count = 0;
        for event in events {
            self.insert(event);
            count += 1;
        }
        trace!(
            "EIT table_id {:#04x} service {}: {} events",
            sect.header.table_id,
            sect.syntax.id(),
            count
        );
        Ok(count)
    }

    /// Removes the events of the same service which start or end within the new event's span,
    /// then adds the new event in order.
    pub fn insert(&mut self, event: EitEvent) {
        let (start, end) = event.interval();
        let span = start..=end;
        self.events.retain(|e| {
            if !e.same_service(&event) {
                return true;
            }
            let (old_start, old_end) = e.interval();
            !(span.contains(&old_start) || span.contains(&old_end))
        });
        let key = event.sort_key();
        let pos = self.events.partition_point(|e| e.sort_key() <= key);
        self.events.insert(pos, event);
    }

    /// Events ordered by `service_id`, `transport_stream_id`, `original_network_id` then
    /// `start_time`.
    pub fn events(&self) -> &[EitEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<EitEvent> {
        std::mem::take(&mut self.events)
    }
}
