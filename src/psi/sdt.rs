//! Types related to the _Service Description Table_ of _ETSI EN 300 468_.
//!
//! The SDT gives the names of the services (channels) in a transport stream.  Sections with
//! `table_id` `0x42` describe the actual transport stream, and those with `0x46` describe other
//! transport streams of the network.

use super::table_status::{Admission, TableStatusTracker};
use super::{length_12, take_field, PsiError, RunningStatus, Section};
use crate::demultiplex::{
    CompleteSection, FilterError, FilterId, FilterSpec, SectionDecoder, SectionFilterBank,
};
use crate::descriptor::{DescriptorError, DescriptorIter, DvbDescriptors};
use crate::packet::Pid;
use log::{debug, warn};

pub const SDT_PID: Pid = Pid::new(0x0011);
/// `service_description_section - actual_transport_stream`
pub const SDT_ACTUAL_TABLE_ID: u8 = 0x42;
/// `service_description_section - other_transport_stream`
pub const SDT_OTHER_TABLE_ID: u8 = 0x46;

// common header, syntax header, original_network_id and a reserved byte
const HEADER_SIZE: usize = 11;
const MIN_SECTION_LENGTH: usize = HEADER_SIZE + 4;
const SERVICE_HEADER_SIZE: usize = 5;

/// The content of one _service_descriptor_.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ServiceInfo {
    pub service_type: u8,
    pub provider_name: String,
    pub service_name: String,
}

/// One service entry of an SDT section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdtService {
    pub table_id: u8,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub service_id: u16,
    pub eit_schedule_flag: bool,
    pub eit_present_following_flag: bool,
    pub running_status: RunningStatus,
    pub free_ca_mode: bool,
    /// One entry per _service_descriptor_, in the order given
    pub services: Vec<ServiceInfo>,
}

impl SdtService {
    fn parse_all(sect: &Section<'_>) -> Result<Vec<SdtService>, PsiError> {
        let table_id = sect.header.table_id;
        let transport_stream_id = sect.syntax.id();
        let original_network_id = u16::from(sect.data[8]) << 8 | u16::from(sect.data[9]);
        let mut rest = sect.body(HEADER_SIZE);
        let mut result = Vec::new();
        while !rest.is_empty() {
            let (header, tail) = take_field("SDT", "service header", rest, SERVICE_HEADER_SIZE)?;
            let (descriptors, tail) =
                take_field("SDT", "descriptors_loop", tail, length_12(&header[3..5]))?;
            result.push(SdtService {
                table_id,
                transport_stream_id,
                original_network_id,
                service_id: u16::from(header[0]) << 8 | u16::from(header[1]),
                eit_schedule_flag: header[2] & 0b10 != 0,
                eit_present_following_flag: header[2] & 0b01 != 0,
                running_status: RunningStatus::from(header[3] >> 5),
                free_ca_mode: header[3] & 0b0001_0000 != 0,
                services: parse_service_descriptors(descriptors),
            });
            rest = tail;
        }
        Ok(result)
    }

    /// The first _service_descriptor_ of the entry, if there is one.
    pub fn service(&self) -> Option<&ServiceInfo> {
        self.services.first()
    }
}

fn parse_service_descriptors(buf: &[u8]) -> Vec<ServiceInfo> {
    DescriptorIter::<DvbDescriptors<'_>>::new(buf)
        .filter_map(|d| match d {
            Ok(DvbDescriptors::Service(s)) => Some(ServiceInfo {
                service_type: s.service_type(),
                provider_name: s.provider_name(),
                service_name: s.service_name(),
            }),
            Ok(_) | Err(DescriptorError::UnhandledTagValue(_)) => None,
            Err(e) => {
                warn!("SDT descriptor skipped: {}", e);
                None
            }
        })
        .collect()
}

/// Collects both the actual and other transport stream variants of the SDT.
#[derive(Debug, Default)]
pub struct SdtDecoder {
    status: TableStatusTracker,
    filter: Option<FilterId>,
    services: Vec<SdtService>,
    complete: bool,
}

impl SdtDecoder {
    pub fn new() -> SdtDecoder {
        SdtDecoder::default()
    }

    /// Registers status for both table ids, and installs a single filter matching either.
    pub fn install(&mut self, bank: &mut SectionFilterBank) -> Result<FilterId, FilterError> {
        // 0x42 and 0x46 differ only in bit 2
        let id = bank.allocate(
            FilterSpec::pid(SDT_PID).table_id(SDT_ACTUAL_TABLE_ID, 0xfb),
            true,
            SectionDecoder::Sdt,
        )?;
        self.status.register(SDT_PID, SDT_ACTUAL_TABLE_ID);
        self.status.register(SDT_PID, SDT_OTHER_TABLE_ID);
        self.filter = Some(id);
        Ok(id)
    }

    /// Returns `Ok(true)` once both table ids are complete, at which point the filter has been
    /// released.
    pub fn decode(
        &mut self,
        bank: &mut SectionFilterBank,
        section: &CompleteSection<'_>,
    ) -> Result<bool, PsiError> {
        let sect = Section::parse("SDT", section.data, MIN_SECTION_LENGTH)?;
        let parsed = SdtService::parse_all(&sect)?;
        let table_id = sect.header.table_id;
        match self.status.admit(section.pid, table_id, &sect.syntax)? {
            Admission::Repeat => return Ok(false),
            Admission::Accepted {
                version_changed: true,
            } => self.services.retain(|s| s.table_id != table_id),
            Admission::Accepted { .. } => (),
        }
        for service in parsed {
            self.insert(service);
        }

        if !self.status.all_complete() {
            return Ok(false);
        }
        if let Some(id) = self.filter.take() {
            bank.release(id);
        }
        self.status.clear();
        debug!("SDT complete with {} services", self.services.len());
        self.complete = true;
        Ok(true)
    }

    fn insert(&mut self, service: SdtService) {
        let pos = self
            .services
            .partition_point(|s| s.service_id <= service.service_id);
        self.services.insert(pos, service);
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Services in ascending `service_id` order.
    pub fn services(&self) -> &[SdtService] {
        &self.services
    }

    pub fn take_services(&mut self) -> Vec<SdtService> {
        std::mem::take(&mut self.services)
    }
}
