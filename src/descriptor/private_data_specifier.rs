//! The private data specifier descriptor identifies whose definitions apply to any private
//! descriptors or private field values that follow it in the same descriptor loop.

use super::DescriptorError;
use std::fmt;

/// Identifies the organisation defining private descriptors within the same loop.
pub struct PrivateDataSpecifierDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> PrivateDataSpecifierDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a
    /// `PrivateDataSpecifierDescriptor`.
    pub const TAG: u8 = 0x5f;
    /// Construct a `PrivateDataSpecifierDescriptor` instance that will parse the data from the
    /// given slice.
    pub fn new(
        _tag: u8,
        buf: &'buf [u8],
    ) -> Result<PrivateDataSpecifierDescriptor<'buf>, DescriptorError> {
        if buf.len() < 4 {
            Err(DescriptorError::NotEnoughData {
                tag: Self::TAG,
                actual: buf.len(),
                expected: 4,
            })
        } else {
            Ok(PrivateDataSpecifierDescriptor { buf })
        }
    }

    /// The 32-bit value registered (via _ETSI TS 101 162_) to the defining organisation.
    pub fn private_data_specifier(&self) -> u32 {
        u32::from(self.buf[0]) << 24
            | u32::from(self.buf[1]) << 16
            | u32::from(self.buf[2]) << 8
            | u32::from(self.buf[3])
    }
}

impl<'buf> fmt::Debug for PrivateDataSpecifierDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("PrivateDataSpecifierDescriptor")
            .field(
                "private_data_specifier",
                &format_args!("{:#010x}", self.private_data_specifier()),
            )
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::super::{Descriptor, DescriptorError, DvbDescriptors};
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn descriptor() {
        let data = hex!("5f04 00000233");
        let desc = DvbDescriptors::from_bytes(&data).unwrap();
        assert_matches!(desc, DvbDescriptors::PrivateDataSpecifier(pds) => {
            assert_eq!(pds.private_data_specifier(), 0x233);
            assert!(!format!("{:?}", pds).is_empty());
        });
    }

    #[test]
    fn too_short() {
        let data = hex!("5f03 000002");
        assert_matches!(
            DvbDescriptors::from_bytes(&data),
            Err(DescriptorError::NotEnoughData {
                tag: 0x5f,
                actual: 3,
                expected: 4
            })
        );
    }
}
