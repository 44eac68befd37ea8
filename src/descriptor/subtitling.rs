//! The subtitling descriptor lists the DVB subtitle services carried by an elementary stream.

use super::{DescriptorError, LanguageCode};
use std::fmt;

/// Describes the subtitle services (one per language / page combination) within a stream.
pub struct SubtitlingDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> SubtitlingDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a `SubtitlingDescriptor`.
    pub const TAG: u8 = 0x59;
    const ENTRY_SIZE: usize = 8;

    /// Requires at least one complete 8-byte entry.
    pub fn new(_tag: u8, buf: &'buf [u8]) -> Result<SubtitlingDescriptor<'buf>, DescriptorError> {
        if buf.len() < Self::ENTRY_SIZE {
            Err(DescriptorError::NotEnoughData {
                tag: Self::TAG,
                actual: buf.len(),
                expected: Self::ENTRY_SIZE,
            })
        } else {
            Ok(SubtitlingDescriptor { buf })
        }
    }

    /// Iterates over the complete 8-byte entries; a trailing partial entry is ignored.
    pub fn entries(&self) -> impl Iterator<Item = SubtitlingEntry> + 'buf {
        self.buf
            .chunks_exact(Self::ENTRY_SIZE)
            .map(SubtitlingEntry::from_bytes)
    }
}

impl<'buf> fmt::Debug for SubtitlingDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_list().entries(self.entries()).finish()
    }
}

/// One subtitle service within a `SubtitlingDescriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitlingEntry {
    pub language: LanguageCode,
    /// content and aspect ratio of the subtitles, per _EN 300 468_ table 2 (`component_type`)
    pub subtitling_type: u8,
    pub composition_page_id: u16,
    pub ancillary_page_id: u16,
}

impl SubtitlingEntry {
    fn from_bytes(buf: &[u8]) -> SubtitlingEntry {
        SubtitlingEntry {
            language: LanguageCode::from_slice(&buf[0..3]),
            subtitling_type: buf[3],
            composition_page_id: u16::from(buf[4]) << 8 | u16::from(buf[5]),
            ancillary_page_id: u16::from(buf[6]) << 8 | u16::from(buf[7]),
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::{Descriptor, DescriptorError, DvbDescriptors, LanguageCode};
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn two_entries() {
        let data = hex!("5911 656e67 10 0001 0002 777777 20 0003 0004 ff");
        let desc = DvbDescriptors::from_bytes(&data).unwrap();
        assert_matches!(desc, DvbDescriptors::Subtitling(sub) => {
            let entries: Vec<_> = sub.entries().collect();
            assert_eq!(
                entries,
                vec![
                    SubtitlingEntry {
                        language: LanguageCode(*b"eng"),
                        subtitling_type: 0x10,
                        composition_page_id: 1,
                        ancillary_page_id: 2,
                    },
                    SubtitlingEntry {
                        language: LanguageCode(*b"www"),
                        subtitling_type: 0x20,
                        composition_page_id: 3,
                        ancillary_page_id: 4,
                    },
                ]
            );
        });
    }

    #[test]
    fn too_short() {
        let data = hex!("5907 656e67 10 0001 00");
        assert_matches!(
            DvbDescriptors::from_bytes(&data),
            Err(DescriptorError::NotEnoughData { tag: 0x59, .. })
        );
    }
}
