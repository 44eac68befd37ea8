//! Descriptors provide metadata about an element of a Transport Stream.
//!
//! For example, a descriptor may give the name of a service, or the title of an event in the
//! programme guide.  Use of specific descriptors is often not mandatory.
//!
//! The syntax of PSI/SI tables allows descriptors to be attached to the table itself, or to
//! entries within the table.  Every descriptor is a tag/length/value triple, so descriptors of
//! a type not known to this crate can always be skipped.
//!
//! The descriptors understood here are those defined by _ETSI EN 300 468_ which the table decoders
//! in [`psi`](../psi/index.html) make use of:
//!
//! ```
//! # use mpeg2ts_catalog::descriptor::{DescriptorIter, DvbDescriptors};
//! let data = [0x5f, 0x04, 0x00, 0x00, 0x00, 0x28];
//! for d in DescriptorIter::<DvbDescriptors<'_>>::new(&data) {
//!     if let Ok(DvbDescriptors::PrivateDataSpecifier(pds)) = d {
//!         assert_eq!(pds.private_data_specifier(), 0x28);
//!     }
//! }
//! ```

pub mod event;
pub mod private_data_specifier;
pub mod service;
pub mod subtitling;
pub mod text;

use self::event::{ExtendedEventDescriptor, ShortEventDescriptor, TimeShiftedEventDescriptor};
use self::private_data_specifier::PrivateDataSpecifierDescriptor;
use self::service::ServiceDescriptor;
use self::subtitling::SubtitlingDescriptor;
use std::fmt;
use std::marker;
use thiserror::Error;

/// Trait allowing a type to be produced by [`DescriptorIter`](struct.DescriptorIter.html) from the
/// raw bytes of a single descriptor (tag and length bytes included).
pub trait Descriptor<'buf>: Sized {
    /// Create an object that can interpret the descriptor held in the given slice.
    fn from_bytes(buf: &'buf [u8]) -> Result<Self, DescriptorError>;
}

/// Builds an enum with one variant per supported descriptor type, and implements
/// [`Descriptor`](descriptor/trait.Descriptor.html) for it by dispatching on the tag value.
///
/// Tags not listed produce `DescriptorError::UnhandledTagValue`.
#[macro_export]
macro_rules! descriptor_enum {
    (
        $(#[$outer:meta])*
        $name:ident {
            $(
                $(#[$inner:ident $($args:tt)*])*
                $case_name:ident $($tags:pat_param)|* => $t:ident
            ),*,
        }
    ) => {
        $(#[$outer])*
        pub enum $name<'buf> {
            $(
                $(#[$inner $($args)*])*
                $case_name($t<'buf>),
            )*
        }
        impl<'buf> $crate::descriptor::Descriptor<'buf> for $name<'buf> {
            fn from_bytes(buf: &'buf[u8]) -> Result<Self, $crate::descriptor::DescriptorError> {
                if buf.len() <  2 {
                    return Err($crate::descriptor::DescriptorError::BufferTooShort{ buflen: buf.len() })
                }
                let tag = buf[0];
                let len = buf[1] as usize;
                let tag_end = len + 2;
                if tag_end > buf.len() {
                    return Err($crate::descriptor::DescriptorError::TagTooLongForBuffer{ taglen: len, buflen: buf.len() })
                }
                let payload = &buf[2..tag_end];
                match tag {
                    $( $( $tags )|* => Ok($name::$case_name($t::new(tag, payload)?)), )*
                    _ => Err($crate::descriptor::DescriptorError::UnhandledTagValue(tag)),
                }
            }
        }
    }
}

descriptor_enum! {
    /// The descriptors used while decoding PMT, SDT and EIT sections.
    #[derive(Debug)]
    DvbDescriptors {
        /// _service_descriptor_, within the SDT
        Service 0x48 => ServiceDescriptor,
        /// _short_event_descriptor_, within the EIT
        ShortEvent 0x4d => ShortEventDescriptor,
        /// _extended_event_descriptor_, within the EIT
        ExtendedEvent 0x4e => ExtendedEventDescriptor,
        /// _time_shifted_event_descriptor_, within the EIT
        TimeShiftedEvent 0x4f => TimeShiftedEventDescriptor,
        /// _subtitling_descriptor_, within the PMT
        Subtitling 0x59 => SubtitlingDescriptor,
        /// _private_data_specifier_descriptor_, within the PMT
        PrivateDataSpecifier 0x5f => PrivateDataSpecifierDescriptor,
    }
}

/// Iterator over the descriptors in a _descriptor loop_.
///
/// Each item is either a descriptor, or an error for a descriptor that could not be parsed.  An
/// error for one descriptor does not stop iteration, except where the declared length runs past
/// the end of the loop, after which no more items are produced.
pub struct DescriptorIter<'buf, Desc>
where
    Desc: Descriptor<'buf>,
{
    buf: &'buf [u8],
    phantom: marker::PhantomData<Desc>,
}
impl<'buf, Desc> DescriptorIter<'buf, Desc>
where
    Desc: Descriptor<'buf>,
{
    /// Create an iterator over the descriptors held in the given slice.
    pub fn new(buf: &'buf [u8]) -> DescriptorIter<'buf, Desc> {
        DescriptorIter {
            buf,
            phantom: marker::PhantomData,
        }
    }
}
impl<'buf, Desc> Iterator for DescriptorIter<'buf, Desc>
where
    Desc: Descriptor<'buf>,
{
    type Item = Result<Desc, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() < 2 {
            let buflen = self.buf.len();
            self.buf = &self.buf[0..0];
            return Some(Err(DescriptorError::BufferTooShort { buflen }));
        }
        let tag = self.buf[0];
        let len = self.buf[1] as usize;
        let remaining_size = self.buf.len() - 2;
        if len > remaining_size {
            // ensure anther call to next() will yield None,
            self.buf = &self.buf[0..0];
            Some(Err(DescriptorError::NotEnoughData {
                tag,
                actual: remaining_size,
                expected: len,
            }))
        } else {
            let (desc, rest) = self.buf.split_at(len + 2);
            self.buf = rest;
            Some(Descriptor::from_bytes(desc))
        }
    }
}

/// An error encountered while parsing a descriptor
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// The payload of the descriptor is too short for the fields its type requires, or the
    /// descriptor length runs past the end of the descriptor loop.
    #[error("descriptor tag {tag:#04x} needs {expected} bytes, only {actual} available")]
    NotEnoughData {
        /// the descriptor tag
        tag: u8,
        /// bytes actually present
        actual: usize,
        /// bytes needed
        expected: usize,
    },
    /// The descriptor length field exceeds the buffer holding the descriptor
    #[error("descriptor length {taglen} too long for buffer of {buflen} bytes")]
    TagTooLongForBuffer {
        /// declared length
        taglen: usize,
        /// available bytes
        buflen: usize,
    },
    /// Not even the tag and length bytes are present
    #[error("buffer of {buflen} bytes too short to hold a descriptor")]
    BufferTooShort {
        /// available bytes
        buflen: usize,
    },
    /// The tag is not one this crate interprets; the descriptor should simply be skipped
    #[error("unhandled descriptor tag {0:#04x}")]
    UnhandledTagValue(u8),
}

/// A 24-bit _ISO_639_language_code_, such as `eng`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LanguageCode(pub [u8; 3]);

impl LanguageCode {
    /// Panics if the slice is shorter than 3 bytes.
    pub fn from_slice(buf: &[u8]) -> LanguageCode {
        LanguageCode([buf[0], buf[1], buf[2]])
    }

    /// The code as a 24-bit value, first character in the most significant byte.
    pub fn as_u32(self) -> u32 {
        u32::from(self.0[0]) << 16 | u32::from(self.0[1]) << 8 | u32::from(self.0[2])
    }
}
impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", char::from(b))?;
        }
        Ok(())
    }
}
impl fmt::Debug for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LanguageCode({})", self)
    }
}

/// Splits a field prefixed by an 8-bit length off the front of `buf`, returning the field and the
/// bytes after it.  A length running past the end of `buf` is clamped to the bytes available.
pub(crate) fn length_prefixed(buf: &[u8]) -> (&[u8], &[u8]) {
    match buf.split_first() {
        None => (&buf[0..0], &buf[0..0]),
        Some((&len, rest)) => rest.split_at((len as usize).min(rest.len())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn unknown_tags_are_skippable() {
        let data = hex!("0a04656e6700 5f0400000028");
        let mut iter = DescriptorIter::<DvbDescriptors<'_>>::new(&data);
        assert_matches!(
            iter.next(),
            Some(Err(DescriptorError::UnhandledTagValue(0x0a)))
        );
        assert_matches!(
            iter.next(),
            Some(Ok(DvbDescriptors::PrivateDataSpecifier(ref d))) if d.private_data_specifier() == 0x28
        );
        assert_matches!(iter.next(), None);
    }

    #[test]
    fn overrunning_length() {
        let data = hex!("5f0a0000");
        let mut iter = DescriptorIter::<DvbDescriptors<'_>>::new(&data);
        assert_matches!(
            iter.next(),
            Some(Err(DescriptorError::NotEnoughData {
                tag: 0x5f,
                actual: 2,
                expected: 10
            }))
        );
        assert_matches!(iter.next(), None);
    }

    #[test]
    fn lone_tag_byte() {
        let data = [0x48];
        let mut iter = DescriptorIter::<DvbDescriptors<'_>>::new(&data);
        assert_matches!(
            iter.next(),
            Some(Err(DescriptorError::BufferTooShort { buflen: 1 }))
        );
        assert_matches!(iter.next(), None);
    }

    #[test]
    fn length_prefix_clamped() {
        let (field, rest) = length_prefixed(&[5, b'a', b'b']);
        assert_eq!(field, b"ab");
        assert!(rest.is_empty());
        let (field, rest) = length_prefixed(&[1, b'a', b'b']);
        assert_eq!(field, b"a");
        assert_eq!(rest, b"b");
        let (field, rest) = length_prefixed(&[]);
        assert!(field.is_empty() && rest.is_empty());
    }

    #[test]
    fn language_code() {
        let lang = LanguageCode::from_slice(b"eng");
        assert_eq!(lang.as_u32(), 0x656e67);
        assert_eq!(lang.to_string(), "eng");
    }
}
