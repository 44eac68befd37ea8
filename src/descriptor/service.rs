//! The service descriptor gives the name and type of a service, within the _Service Description
//! Table_.

use super::{length_prefixed, text, DescriptorError};
use std::fmt;

/// Provider name, service name and service type of an SDT entry.
///
/// Name lengths that run past the end of the descriptor are clamped to the bytes present.
pub struct ServiceDescriptor<'buf> {
    buf: &'buf [u8],
}
impl<'buf> ServiceDescriptor<'buf> {
    /// The descriptor tag value which identifies the descriptor as a `ServiceDescriptor`.
    pub const TAG: u8 = 0x48;
    const MIN_SIZE: usize = 3;

    pub fn new(_tag: u8, buf: &'buf [u8]) -> Result<ServiceDescriptor<'buf>, DescriptorError> {
        if buf.len() < Self::MIN_SIZE {
            Err(DescriptorError::NotEnoughData {
                tag: Self::TAG,
                actual: buf.len(),
                expected: Self::MIN_SIZE,
            })
        } else {
            Ok(ServiceDescriptor { buf })
        }
    }

    /// e.g. `0x01` for digital television, `0x02` for digital radio
    pub fn service_type(&self) -> u8 {
        self.buf[0]
    }

    /// Raw bytes of the _service_provider_name_ field.
    pub fn provider_name_bytes(&self) -> &'buf [u8] {
        length_prefixed(&self.buf[1..]).0
    }

    /// Raw bytes of the _service_name_ field.
    pub fn service_name_bytes(&self) -> &'buf [u8] {
        let (_, rest) = length_prefixed(&self.buf[1..]);
        length_prefixed(rest).0
    }

    pub fn provider_name(&self) -> String {
        text::decode(self.provider_name_bytes())
    }

    pub fn service_name(&self) -> String {
        text::decode(self.service_name_bytes())
    }
}

impl<'buf> fmt::Debug for ServiceDescriptor<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("ServiceDescriptor")
            .field("service_type", &self.service_type())
            .field("provider_name", &self.provider_name())
            .field("service_name", &self.service_name())
            .finish()
    }
}
