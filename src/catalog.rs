//! Joins the decoded PAT, PMT, SDT and EIT tables into one entry per program.
//!
//! Records which find no partner in the join (a PAT entry with no PMT, an SDT service or EIT
//! event with no matching program) are left out of the catalog; this is not an error.

use crate::packet::Pid;
use crate::psi::eit::{
    duration_seconds, EitEvent, ExtendedEvent, ShortEvent, TimeShiftedEvent, UtcTime,
};
use crate::psi::pat::PatEntry;
use crate::psi::pmt::{ElementaryStream, PmtProgram};
use crate::psi::sdt::{SdtService, SDT_ACTUAL_TABLE_ID};
use crate::psi::RunningStatus;
use log::{debug, trace};

/// A programme guide event of a catalog entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    pub event_id: u16,
    /// 40-bit MJD + BCD encoded UTC start time
    pub start_time: u64,
    /// 24-bit BCD encoded `hhmmss`
    pub duration: u32,
    pub running_status: RunningStatus,
    pub short_events: Vec<ShortEvent>,
    pub extended_events: Vec<ExtendedEvent>,
    pub time_shifted_events: Vec<TimeShiftedEvent>,
}

impl EventData {
    pub fn start_time_utc(&self) -> UtcTime {
        UtcTime::from_raw(self.start_time)
    }

    pub fn duration_seconds(&self) -> u32 {
        duration_seconds(self.duration)
    }

    /// Keeps only the short events whose name shares its first three characters with the
    /// service name.
    fn from_event(event: EitEvent, service_name: &str) -> EventData {
        let short_events = event
            .short_events
            .into_iter()
            .filter(|s| {
                s.event_name
                    .chars()
                    .take(3)
                    .eq(service_name.chars().take(3))
            })
            .collect();
        EventData {
            event_id: event.event_id,
            start_time: event.start_time,
            duration: event.duration,
            running_status: event.running_status,
            short_events,
            extended_events: event.extended_events,
            time_shifted_events: event.time_shifted_events,
        }
    }
}

/// One program of the transport stream, with its service description and events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramInfo {
    pub program_number: u16,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub pcr_pid: Pid,
    /// Only those streams for which `StreamType::is_catalog_target()` holds
    pub streams: Vec<ElementaryStream>,
    pub service_type: u8,
    pub provider_name: String,
    pub service_name: String,
    /// Events in ascending `start_time` order
    pub events: Vec<EventData>,
}

impl ProgramInfo {
    fn new(entry: &PatEntry, program: &PmtProgram) -> ProgramInfo {
        ProgramInfo {
            program_number: entry.program_number,
            transport_stream_id: entry.transport_stream_id,
            original_network_id: 0,
            pcr_pid: program.pcr_pid,
            streams: program
                .streams
                .iter()
                .filter(|s| s.stream_type.is_catalog_target())
                .cloned()
                .collect(),
            service_type: 0,
            provider_name: String::new(),
            service_name: String::new(),
            events: Vec::new(),
        }
    }

    /// The PCR PID followed by the PIDs of the elementary streams, without repeats.
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids = vec![self.pcr_pid];
        for s in &self.streams {
            if !pids.contains(&s.elementary_pid) {
                pids.push(s.elementary_pid);
            }
        }
        pids
    }

    fn add_event(&mut self, event: EventData) {
        let pos = self
            .events
            .partition_point(|e| e.start_time <= event.start_time);
        self.events.insert(pos, event);
    }
}

/// Takes ownership of the tables collected by the decoders, and produces the catalog.
pub struct ProgramCatalogBuilder {
    pat: Vec<PatEntry>,
    pmt: Vec<PmtProgram>,
    sdt: Vec<SdtService>,
    eit: Vec<EitEvent>,
}

impl ProgramCatalogBuilder {
    pub fn new(
        pat: Vec<PatEntry>,
        pmt: Vec<PmtProgram>,
        sdt: Vec<SdtService>,
        eit: Vec<EitEvent>,
    ) -> ProgramCatalogBuilder {
        ProgramCatalogBuilder { pat, pmt, sdt, eit }
    }

    /// Returns the catalog in ascending `program_number` order.
    pub fn build(self) -> Vec<ProgramInfo> {
        let ProgramCatalogBuilder { pat, pmt, sdt, eit } = self;
        let mut catalog: Vec<ProgramInfo> = Vec::new();
        for entry in &pat {
            let Some(program) = pmt
                .iter()
                .find(|p| p.program_number == entry.program_number)
            else {
                trace!("no PMT for program {}", entry.program_number);
                continue;
            };
            let info = ProgramInfo::new(entry, program);
            let pos = catalog.partition_point(|p| p.program_number <= info.program_number);
            catalog.insert(pos, info);
        }

        for service in sdt.iter().filter(|s| s.table_id == SDT_ACTUAL_TABLE_ID) {
            let Some(info) = catalog.iter_mut().find(|p| {
                p.program_number == service.service_id
                    && p.transport_stream_id == service.transport_stream_id
            }) else {
                continue;
            };
            info.original_network_id = service.original_network_id;
            if let Some(desc) = service.service() {
                info.service_type = desc.service_type;
                info.provider_name = desc.provider_name.clone();
                info.service_name = desc.service_name.clone();
            }
        }

        name_unnamed(&mut catalog);

        for event in eit {
            let Some(info) = catalog.iter_mut().find(|p| {
                p.program_number == event.service_id
                    && p.transport_stream_id == event.transport_stream_id
                    && p.original_network_id == event.original_network_id
            }) else {
                continue;
            };
            let data = EventData::from_event(event, &info.service_name);
            info.add_event(data);
        }
        debug!("catalog built with {} programs", catalog.len());
        catalog
    }
}

// placeholders are numbered from 1, separately for providers and services
fn name_unnamed(catalog: &mut [ProgramInfo]) {
    let mut providers = 0;
    let mut services = 0;
    for info in catalog {
        if info.provider_name.is_empty() {
            providers += 1;
            info.provider_name = format!("provider_name_{}", providers);
        }
        if info.service_name.is_empty() {
            services += 1;
            info.service_name = format!("service_name_{}", services);
        }
    }
}

/// Finds the catalog entry for the given program.
pub fn find_by_program_number(catalog: &[ProgramInfo], program_number: u16) -> Option<&ProgramInfo> {
    catalog.iter().find(|p| p.program_number == program_number)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptor::LanguageCode;
    use crate::psi::pmt::DescriptorSet;
    use crate::psi::sdt::{ServiceInfo, SDT_OTHER_TABLE_ID};
    use crate::StreamType;

    fn pat_entry(program_number: u16) -> PatEntry {
        PatEntry {
            transport_stream_id: 1,
            program_number,
            program_map_pid: Pid::new(0x100 + program_number),
        }
    }

    fn stream(stream_type: u8, pid: u16) -> ElementaryStream {
        ElementaryStream {
            stream_type: StreamType::from(stream_type),
            elementary_pid: Pid::new(pid),
            descriptors: DescriptorSet::default(),
        }
    }

    fn program(program_number: u16, streams: Vec<ElementaryStream>) -> PmtProgram {
        PmtProgram {
            program_number,
            pcr_pid: Pid::new(0x200 + program_number),
            descriptors: DescriptorSet::default(),
            streams,
        }
    }

    fn service(table_id: u8, service_id: u16, provider: &str, name: &str) -> SdtService {
        SdtService {
            table_id,
            transport_stream_id: 1,
            original_network_id: 9,
            service_id,
            eit_schedule_flag: true,
            eit_present_following_flag: true,
            running_status: RunningStatus::Running,
            free_ca_mode: false,
            services: vec![ServiceInfo {
                service_type: 1,
                provider_name: provider.to_string(),
                service_name: name.to_string(),
            }],
        }
    }

    fn short(name: &str) -> ShortEvent {
        ShortEvent {
            language: LanguageCode(*b"eng"),
            event_name: name.to_string(),
            text: String::new(),
        }
    }

    fn event(service_id: u16, event_id: u16, start_time: u64, names: &[&str]) -> EitEvent {
        EitEvent {
            service_id,
            transport_stream_id: 1,
            original_network_id: 9,
            segment_last_section_number: 0,
            last_table_id: 0x4e,
            event_id,
            start_time,
            duration: 0x003000,
            running_status: RunningStatus::Running,
            free_ca_mode: false,
            short_events: names.iter().map(|n| short(n)).collect(),
            extended_events: Vec::new(),
            time_shifted_events: vec![TimeShiftedEvent {
                reference_service_id: 1,
                reference_event_id: 2,
            }],
        }
    }

    #[test]
    fn join_tables() {
        let catalog = ProgramCatalogBuilder::new(
            vec![pat_entry(100)],
            vec![program(100, vec![stream(0x02, 0x102), stream(0x81, 0x103)])],
            vec![service(SDT_ACTUAL_TABLE_ID, 100, "BBC", "NEWS")],
            vec![event(100, 5, 0xc079120000, &["NEWS at six", "Film"])],
        )
        .build();
        assert_eq!(catalog.len(), 1);
        let p = &catalog[0];
        assert_eq!(p.program_number, 100);
        assert_eq!(p.original_network_id, 9);
        assert_eq!(p.pcr_pid, Pid::new(0x264));
        assert_eq!(p.streams.len(), 1);
        assert_eq!(p.streams[0].elementary_pid, Pid::new(0x102));
        assert_eq!(p.service_name, "NEWS");
        assert_eq!(p.provider_name, "BBC");
        assert_eq!(p.events.len(), 1);
        let e = &p.events[0];
        assert_eq!(e.event_id, 5);
        assert_eq!(e.short_events, vec![short("NEWS at six")]);
        assert_eq!(e.time_shifted_events.len(), 1);
        assert_eq!(e.duration_seconds(), 1800);
        assert_eq!(e.start_time_utc().to_string(), "1993-10-13 12:00:00");
        assert_eq!(p.pids(), vec![Pid::new(0x264), Pid::new(0x102)]);
    }

    #[test]
    fn ordered_by_program_number() {
        let catalog = ProgramCatalogBuilder::new(
            vec![pat_entry(3), pat_entry(1), pat_entry(2)],
            vec![program(1, vec![]), program(2, vec![]), program(3, vec![])],
            vec![],
            vec![],
        )
        .build();
        let numbers: Vec<_> = catalog.iter().map(|p| p.program_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(find_by_program_number(&catalog, 2).is_some());
        assert!(find_by_program_number(&catalog, 4).is_none());
    }

    #[test]
    fn pat_entry_without_pmt_dropped() {
        let catalog = ProgramCatalogBuilder::new(
            vec![pat_entry(1), pat_entry(2)],
            vec![program(2, vec![])],
            vec![],
            vec![],
        )
        .build();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].program_number, 2);
    }

    #[test]
    fn placeholder_names() {
        let catalog = ProgramCatalogBuilder::new(
            vec![pat_entry(1), pat_entry(2), pat_entry(3)],
            vec![program(1, vec![]), program(2, vec![]), program(3, vec![])],
            vec![
                service(SDT_ACTUAL_TABLE_ID, 2, "", "TWO"),
                // other transport stream entries are never joined
                service(SDT_OTHER_TABLE_ID, 3, "P", "THREE"),
            ],
            vec![],
        )
        .build();
        let names: Vec<_> = catalog
            .iter()
            .map(|p| (p.provider_name.as_str(), p.service_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("provider_name_1", "service_name_1"),
                ("provider_name_2", "TWO"),
                ("provider_name_3", "service_name_2"),
            ]
        );
    }

    #[test]
    fn events_sorted_and_matched() {
        let catalog = ProgramCatalogBuilder::new(
            vec![pat_entry(1)],
            vec![program(1, vec![])],
            vec![service(SDT_ACTUAL_TABLE_ID, 1, "P", "Ab")],
            vec![
                event(1, 2, 0xc079130000, &["Ab"]),
                event(1, 1, 0xc079120000, &["Abc"]),
                event(2, 3, 0xc079110000, &["Ab"]),
            ],
        )
        .build();
        let p = &catalog[0];
        let ids: Vec<_> = p.events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2]);
        // "Abc" and "Ab" differ within the first three characters
        assert!(p.events[0].short_events.is_empty());
        assert_eq!(p.events[1].short_events.len(), 1);
    }

    #[test]
    fn event_for_other_network_dropped() {
        let mut e = event(1, 1, 0xc079120000, &[]);
        e.original_network_id = 10;
        let catalog = ProgramCatalogBuilder::new(
            vec![pat_entry(1)],
            vec![program(1, vec![])],
            vec![service(SDT_ACTUAL_TABLE_ID, 1, "P", "S")],
            vec![e],
        )
        .build();
        assert!(catalog[0].events.is_empty());
    }
}
