//! Decoding of the _Program Specific Information_ (ISO/IEC 13818-1) and DVB _Service Information_
//! (ETSI EN 300 468) tables of an MPEG2 Transport Stream, producing a catalog of the programs in
//! the stream together with their service names and programme guide events.
//!
//! # Overview
//!
//!  * A [`PacketSource`](source/trait.PacketSource.html) supplies fixed-size packets, from a file
//!    or from memory, with the packet size optionally detected from the data.
//!  * A [`SectionFilterBank`](demultiplex/struct.SectionFilterBank.html) matches packets against
//!    up to 32 filters, and reassembles and CRC-checks the sections carried in the matching PIDs.
//!  * Complete sections are dispatched to the table decoders in the [`psi`](psi/index.html)
//!    module, which use a [`TableStatusTracker`](psi/table_status/struct.TableStatusTracker.html)
//!    to accept each version of each section only once.
//!  * [`ProgramCatalogBuilder`](catalog/struct.ProgramCatalogBuilder.html) joins the collected
//!    tables into a list of [`ProgramInfo`](catalog/struct.ProgramInfo.html).
//!
//! [`PsiSession`](session/struct.PsiSession.html) wires all of this together:
//!
//! ```no_run
//! use mpeg2ts_catalog::session::PsiSession;
//! use mpeg2ts_catalog::source::ReadPacketSource;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = std::fs::File::open("capture.ts")?;
//! let (mut source, _offset) = ReadPacketSource::detect(file)?;
//! let mut session = PsiSession::new()?;
//! session.run(&mut source)?;
//! for program in session.build_catalog() {
//!     println!("{} {}", program.program_number, program.service_name);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]

pub mod catalog;
pub mod demultiplex;
pub mod descriptor;
pub mod extract;
pub mod mpegts_crc;
pub mod packet;
pub mod psi;
pub mod session;
pub mod source;

#[cfg(test)]
mod testutil;

/// The type of data carried in an elementary stream, as given by the `stream_type` field of the
/// Program Map Table.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum StreamType {
    // 0x00 reserved
    Iso11172Video,
    H262,
    Iso11172Audio,
    Iso138183Audio,
    H2220PrivateSections,
    H2220PesPrivateData,
    Mheg,
    H2220DsmCc,
    H2221,
    Iso138186MultiprotocolEncapsulation,
    DsmccUnMessages,
    DsmccStreamDescriptors,
    DsmccSections,
    H2220Auxiliary,
    Adts,
    Iso144962Visual,
    Latm,
    FlexMuxPes,
    FlexMuxIso14496Sections,
    SynchronizedDownloadProtocol,
    MetadataInPes,
    MetadataInMetadataSections,
    DsmccDataCarouselMetadata,
    DsmccObjectCarouselMetadata,
    SynchronizedDownloadProtocolMetadata,
    Ipmp,
    H264,
    /// ISO/IEC 14496-3 audio without additional transport syntax
    Iso144963Audio,
    // 0x1d-0x23 reserved
    H265,
    // 0x25-0x41 reserved
    ChineseVideoStandard,
    // 0x43-0x7f reserved
    // 0x80 privately defined
    AtscDolbyDigitalAudio,
    // 0x82-0x94 privately defined
    AtscDsmccNetworkResourcesTable,
    // 0x95-0xc1 privately defined
    AtscDsmccSynchronousData,
    // 0xc3-0xff privately defined,
    Private(u8),
    Reserved(u8),
}

impl StreamType {
    /// `true` for the video, audio, private data and section types which are kept in a
    /// [`ProgramInfo`](catalog/struct.ProgramInfo.html).  Privately defined types (`0x80` and
    /// above) are not included.
    pub fn is_catalog_target(self) -> bool {
        matches!(
            self,
            StreamType::Iso11172Video
                | StreamType::H262
                | StreamType::H264
                | StreamType::H265
                | StreamType::Iso11172Audio
                | StreamType::Iso138183Audio
                | StreamType::Adts
                | StreamType::H2220PrivateSections
                | StreamType::H2220PesPrivateData
                | StreamType::DsmccSections
                | StreamType::Latm
                | StreamType::Iso144963Audio
        )
    }
}

impl From<u8> for StreamType {
    fn from(val: u8) -> Self {
        match val {
            0x01 => StreamType::Iso11172Video,
            0x02 => StreamType::H262,
            0x03 => StreamType::Iso11172Audio,
            0x04 => StreamType::Iso138183Audio,
            0x05 => StreamType::H2220PrivateSections,
            0x06 => StreamType::H2220PesPrivateData,
            0x07 => StreamType::Mheg,
            0x08 => StreamType::H2220DsmCc,
            0x09 => StreamType::H2221,
            0x0A => StreamType::Iso138186MultiprotocolEncapsulation,
            0x0B => StreamType::DsmccUnMessages,
            0x0C => StreamType::DsmccStreamDescriptors,
            0x0D => StreamType::DsmccSections,
            0x0E => StreamType::H2220Auxiliary,
            0x0F => StreamType::Adts,
            0x10 => StreamType::Iso144962Visual,
            0x11 => StreamType::Latm,
            0x12 => StreamType::FlexMuxPes,
            0x13 => StreamType::FlexMuxIso14496Sections,
            0x14 => StreamType::SynchronizedDownloadProtocol,
            0x15 => StreamType::MetadataInPes,
            0x16 => StreamType::MetadataInMetadataSections,
            0x17 => StreamType::DsmccDataCarouselMetadata,
            0x18 => StreamType::DsmccObjectCarouselMetadata,
            0x19 => StreamType::SynchronizedDownloadProtocolMetadata,
            0x1a => StreamType::Ipmp,
            0x1b => StreamType::H264,
            0x1c => StreamType::Iso144963Audio,
            0x24 => StreamType::H265,
            0x42 => StreamType::ChineseVideoStandard,
            0x81 => StreamType::AtscDolbyDigitalAudio,
            0x95 => StreamType::AtscDsmccNetworkResourcesTable,
            0xc2 => StreamType::AtscDsmccSynchronousData,
            _ => {
                if val >= 0x80 {
                    StreamType::Private(val)
                } else {
                    StreamType::Reserved(val)
                }
            }
        }
    }
}

impl From<StreamType> for u8 {
    fn from(val: StreamType) -> Self {
        match val {
            StreamType::Iso11172Video => 0x01,
            StreamType::H262 => 0x02,
            StreamType::Iso11172Audio => 0x03,
            StreamType::Iso138183Audio => 0x04,
            StreamType::H2220PrivateSections => 0x05,
            StreamType::H2220PesPrivateData => 0x06,
            StreamType::Mheg => 0x07,
            StreamType::H2220DsmCc => 0x08,
            StreamType::H2221 => 0x09,
            StreamType::Iso138186MultiprotocolEncapsulation => 0x0A,
            StreamType::DsmccUnMessages => 0x0B,
            StreamType::DsmccStreamDescriptors => 0x0C,
            StreamType::DsmccSections => 0x0D,
            StreamType::H2220Auxiliary => 0x0E,
            StreamType::Adts => 0x0F,
            StreamType::Iso144962Visual => 0x10,
            StreamType::Latm => 0x11,
            StreamType::FlexMuxPes => 0x12,
            StreamType::FlexMuxIso14496Sections => 0x13,
            StreamType::SynchronizedDownloadProtocol => 0x14,
            StreamType::MetadataInPes => 0x15,
            StreamType::MetadataInMetadataSections => 0x16,
            StreamType::DsmccDataCarouselMetadata => 0x17,
            StreamType::DsmccObjectCarouselMetadata => 0x18,
            StreamType::SynchronizedDownloadProtocolMetadata => 0x19,
            StreamType::Ipmp => 0x1a,
            StreamType::H264 => 0x1b,
            StreamType::Iso144963Audio => 0x1c,
            StreamType::H265 => 0x24,
            StreamType::ChineseVideoStandard => 0x42,
            StreamType::AtscDolbyDigitalAudio => 0x81,
            StreamType::AtscDsmccNetworkResourcesTable => 0x95,
            StreamType::AtscDsmccSynchronousData => 0xc2,
            StreamType::Reserved(val) => val,
            StreamType::Private(val) => val,
        }
    }
}
