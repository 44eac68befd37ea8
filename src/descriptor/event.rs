//! Descriptors attached to events within the _Event Information Table_.

use super::{length_prefixed, text, DescriptorError, LanguageCode};
use std::fmt;

fn require(tag: u8, buf: &[u8], expected: usize) -> Result<(), DescriptorError> {
    if buf.len() < expected {
        Err(DescriptorError::NotEnoughData {
            tag,
            actual: buf.len(),
            expected,
        })
    } else {
        Ok(())
    }
}

/// Event title and a short description, in one language.
pub struct ShortEventDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> ShortEventDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a `ShortEventDescriptor`.
    pub const TAG: u8 = 0x4d;

    pub fn new(_tag: u8, buf: &'buf [u8]) -> Result<ShortEventDescriptor<'buf>, DescriptorError> {
        require(Self::TAG, buf, 4)?;
        Ok(ShortEventDescriptor { buf })
    }

    pub fn language(&self) -> LanguageCode {
        LanguageCode::from_slice(self.buf)
    }
    /// Raw bytes of the _event_name_ field, clamped to the descriptor.
    pub fn event_name_bytes(&self) -> &'buf [u8] {
        length_prefixed(&self.buf[3..]).0
    }
    /// Raw bytes of the _text_ field, clamped to the descriptor.
    pub fn text_bytes(&self) -> &'buf [u8] {
        let (_, rest) = length_prefixed(&self.buf[3..]);
        length_prefixed(rest).0
    }
    pub fn event_name(&self) -> String {
        text::decode(self.event_name_bytes())
    }
    pub fn text(&self) -> String {
        text::decode(self.text_bytes())
    }
}
impl<'buf> fmt::Debug for ShortEventDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("ShortEventDescriptor")
            .field("language", &self.language())
            .field("event_name", &self.event_name())
            .field("text", &self.text())
            .finish()
    }
}

/// One part of a longer event description, which may be split over several descriptors.
pub struct ExtendedEventDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> ExtendedEventDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as an `ExtendedEventDescriptor`.
    pub const TAG: u8 = 0x4e;

    pub fn new(
        _tag: u8,
        buf: &'buf [u8],
    ) -> Result<ExtendedEventDescriptor<'buf>, DescriptorError> {
        require(Self::TAG, buf, 5)?;
        Ok(ExtendedEventDescriptor { buf })
    }

    /// position of this descriptor within the sequence of extended event descriptors
    pub fn descriptor_number(&self) -> u8 {
        self.buf[0] >> 4
    }
    pub fn last_descriptor_number(&self) -> u8 {
        self.buf[0] & 0b0000_1111
    }
    pub fn language(&self) -> LanguageCode {
        LanguageCode::from_slice(&self.buf[1..4])
    }
    /// The loop of (_item_description_, _item_) pairs, left undecoded.
    pub fn items(&self) -> &'buf [u8] {
        length_prefixed(&self.buf[4..]).0
    }
    pub fn text_bytes(&self) -> &'buf [u8] {
        let (_, rest) = length_prefixed(&self.buf[4..]);
        length_prefixed(rest).0
    }
    pub fn text(&self) -> String {
        text::decode(self.text_bytes())
    }
}
impl<'buf> fmt::Debug for ExtendedEventDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("ExtendedEventDescriptor")
            .field("descriptor_number", &self.descriptor_number())
            .field("last_descriptor_number", &self.last_descriptor_number())
            .field("language", &self.language())
            .field("items_len", &self.items().len())
            .field("text", &self.text())
            .finish()
    }
}

/// Marks an event as a time shifted copy of an event in another service.
pub struct TimeShiftedEventDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> TimeShiftedEventDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a
    /// `TimeShiftedEventDescriptor`.
    pub const TAG: u8 = 0x4f;

    pub fn new(
        _tag: u8,
        buf: &'buf [u8],
    ) -> Result<TimeShiftedEventDescriptor<'buf>, DescriptorError> {
        require(Self::TAG, buf, 4)?;
        Ok(TimeShiftedEventDescriptor { buf })
    }

    pub fn reference_service_id(&self) -> u16 {
        u16::from(self.buf[0]) << 8 | u16::from(self.buf[1])
    }
    pub fn reference_event_id(&self) -> u16 {
        u16::from(self.buf[2]) << 8 | u16::from(self.buf[3])
    }
}
impl<'buf> fmt::Debug for TimeShiftedEventDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("TimeShiftedEventDescriptor")
            .field("reference_service_id", &self.reference_service_id())
            .field("reference_event_id", &self.reference_event_id())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::super::{Descriptor, DescriptorError, DvbDescriptors, LanguageCode};
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn short_event() {
        // eng, "NEWS", "Headlines"
        let data = hex!("4d12 656e67 044e455753 09486561646c696e6573");
        let desc = DvbDescriptors::from_bytes(&data).unwrap();
        assert_matches!(desc, DvbDescriptors::ShortEvent(ev) => {
            assert_eq!(ev.language(), LanguageCode(*b"eng"));
            assert_eq!(ev.event_name(), "NEWS");
            assert_eq!(ev.text(), "Headlines");
        });
    }

    #[test]
    fn short_event_text_clamped() {
        // text_length of 0x20 runs past the end of the descriptor
        let data = hex!("4d0a 656e67 024142 20434445");
        let desc = DvbDescriptors::from_bytes(&data).unwrap();
        assert_matches!(desc, DvbDescriptors::ShortEvent(ev) => {
            assert_eq!(ev.event_name(), "AB");
            assert_eq!(ev.text_bytes(), b"CDE");
        });
    }

    #[test]
    fn short_event_too_short() {
        let data = hex!("4d03 656e67");
        assert_matches!(
            DvbDescriptors::from_bytes(&data),
            Err(DescriptorError::NotEnoughData { tag: 0x4d, .. })
        );
    }

    #[test]
    fn extended_event() {
        let data = hex!("4e0d 13 667261 03010203 0448656c6c");
        let desc = DvbDescriptors::from_bytes(&data).unwrap();
        assert_matches!(desc, DvbDescriptors::ExtendedEvent(ev) => {
            assert_eq!(ev.descriptor_number(), 1);
            assert_eq!(ev.last_descriptor_number(), 3);
            assert_eq!(ev.language(), LanguageCode(*b"fra"));
            assert_eq!(ev.items(), &[1, 2, 3]);
            assert_eq!(ev.text(), "Hell");
        });
    }

    #[test]
    fn time_shifted_event() {
        let data = hex!("4f04 1234 abcd");
        let desc = DvbDescriptors::from_bytes(&data).unwrap();
        assert_matches!(desc, DvbDescriptors::TimeShiftedEvent(ev) => {
            assert_eq!(ev.reference_service_id(), 0x1234);
            assert_eq!(ev.reference_event_id(), 0xabcd);
        });
    }
}
