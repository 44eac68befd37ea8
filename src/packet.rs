//! A [`Packet`](./struct.Packet.html) struct and associated infrastructure to read the header of
//! an MPEG Transport Stream packet and locate its payload.

use log::warn;
use std::convert::TryFrom;
use std::fmt;

/// the different values indicating whether a `Packet` carries an adaptation field, a payload, or
/// both.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AdaptationControl {
    /// This value is used if the transport stream packet `adaptation_control` field uses the value
    /// `0b00`, which is not defined by _ISO/IEC 13818-1_.
    Reserved,
    /// indicates that this packet contains a payload, but not an adaptation field
    PayloadOnly,
    /// indicates that this packet contains an adaptation field, but not a payload
    AdaptationFieldOnly,
    /// indicates that this packet contains both an adaptation field and a payload
    AdaptationFieldAndPayload,
}

impl AdaptationControl {
    #[inline(always)]
    fn from(val: u8) -> AdaptationControl {
        match val & 0b11 {
            0 => AdaptationControl::Reserved,
            1 => AdaptationControl::PayloadOnly,
            2 => AdaptationControl::AdaptationFieldOnly,
            _ => AdaptationControl::AdaptationFieldAndPayload,
        }
    }

    /// True if this AdaptationControl variant indicates that the packet will have a payload
    #[inline(always)]
    pub fn has_payload(self) -> bool {
        match self {
            AdaptationControl::Reserved | AdaptationControl::AdaptationFieldOnly => false,
            AdaptationControl::PayloadOnly | AdaptationControl::AdaptationFieldAndPayload => true,
        }
    }
}

/// A Packet Identifier value, between `0x0000` and `0x1fff`.
///
/// PID values identify a particular sub-stream within the overall Transport Stream.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(u16);
impl Pid {
    /// The largest possible PID value, `0x1fff`.
    pub const MAX_VALUE: u16 = 0x1fff;

    /// Panics if the given value is greater than `Pid::MAX_VALUE`.
    pub const fn new(pid: u16) -> Pid {
        assert!(pid <= Pid::MAX_VALUE);
        Pid(pid)
    }

    /// Builds a `Pid` from the low 13 bits of a 16-bit field, as PIDs are carried within PSI
    /// tables.
    #[inline]
    pub const fn from_masked(val: u16) -> Pid {
        Pid(val & Pid::MAX_VALUE)
    }

    /// The PID as a plain integer, usable in `const` context where `u16::from()` is not.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }
}
impl TryFrom<u16> for Pid {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value <= Pid::MAX_VALUE {
            Ok(Pid(value))
        } else {
            Err(())
        }
    }
}
impl From<Pid> for u16 {
    #[inline]
    fn from(pid: Pid) -> Self {
        pid.0
    }
}
impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Pid({:04x})", self.0)
    }
}
impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:#06x}", self.0)
    }
}

/// The sizes in which transport stream packets are stored.
///
/// Whatever the stored size, the first 188 bytes always hold the transport stream packet itself;
/// the 192-byte form prefixes a further 4 bytes of timestamp to the *following* packet, and the
/// 204-byte form appends 16 bytes of Reed-Solomon parity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketSize {
    /// Plain 188-byte packets
    Ts188,
    /// 192-byte packets, as recorded by D-VHS and Blu-ray equipment
    Dvhs192,
    /// 204-byte packets carrying forward error correction data
    Fec204,
}

impl PacketSize {
    /// The candidates tried, in order, when detecting the packet size of a stream.
    pub const CANDIDATES: [PacketSize; 3] =
        [PacketSize::Ts188, PacketSize::Dvhs192, PacketSize::Fec204];

    /// number of bytes occupied by each packet
    pub const fn len(self) -> usize {
        match self {
            PacketSize::Ts188 => 188,
            PacketSize::Dvhs192 => 192,
            PacketSize::Fec204 => 204,
        }
    }
}

impl TryFrom<usize> for PacketSize {
    type Error = ();

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        PacketSize::CANDIDATES
            .iter()
            .copied()
            .find(|s| s.len() == value)
            .ok_or(())
    }
}

/// A transport stream `Packet` is a wrapper around a byte slice which allows the bytes to be
/// interpreted as a packet structure per _ISO/IEC 13818-1, Section 2.4.3.3_.
pub struct Packet<'buf> {
    buf: &'buf [u8],
}

/// Size of the 4-byte header present at the start of every packet.
pub const FIXED_HEADER_SIZE: usize = 4;
// when AF present, a 1-byte 'length' field precedes the content,
const ADAPTATION_FIELD_OFFSET: usize = FIXED_HEADER_SIZE + 1;

impl<'buf> Packet<'buf> {
    /// The value `0x47`, which must appear in the first byte of every transport stream packet.
    pub const SYNC_BYTE: u8 = 0x47;

    /// The fixed 188 byte size of a transport stream packet.
    pub const SIZE: usize = 188;

    /// returns `true` if the given value is the synchronisation byte `0x47`.
    #[inline(always)]
    pub fn is_sync_byte(b: u8) -> bool {
        b == Self::SYNC_BYTE
    }

    /// Returns `None` if the buffer is shorter than `Packet::SIZE`, or if the initial sync-byte
    /// has an incorrect value.  Any bytes beyond `Packet::SIZE` (timestamp or parity data of
    /// 192 and 204 byte packets) are ignored.
    #[inline(always)]
    pub fn try_new(buf: &'buf [u8]) -> Option<Packet<'buf>> {
        if buf.len() >= Self::SIZE && Packet::is_sync_byte(buf[0]) {
            Some(Packet {
                buf: &buf[..Self::SIZE],
            })
        } else {
            None
        }
    }

    /// `true` if a new section (or PES packet) begins within this packet's payload.
    #[inline]
    pub fn payload_unit_start_indicator(&self) -> bool {
        self.buf[1] & 0b0100_0000 != 0
    }

    /// The sub-stream to which a particular packet belongs is indicated by this Packet Identifier
    /// value.
    #[inline]
    pub fn pid(&self) -> Pid {
        Pid(u16::from(self.buf[1] & 0b0001_1111) << 8 | u16::from(self.buf[2]))
    }

    #[inline]
    pub fn adaptation_control(&self) -> AdaptationControl {
        AdaptationControl::from(self.buf[3] >> 4)
    }

    fn adaptation_field_length(&self) -> usize {
        self.buf[4] as usize
    }

    /// Offset of the first payload byte within the packet, or `None` if `adaptation_control()`
    /// indicates there is no payload, or the adaptation field leaves no room for one.
    ///
    /// The returned offset is always within `4..Packet::SIZE`.
    #[inline]
    pub fn payload_offset(&self) -> Option<usize> {
        let offset = match self.adaptation_control() {
            AdaptationControl::Reserved | AdaptationControl::AdaptationFieldOnly => return None,
            AdaptationControl::PayloadOnly => FIXED_HEADER_SIZE,
            AdaptationControl::AdaptationFieldAndPayload => {
                ADAPTATION_FIELD_OFFSET + self.adaptation_field_length()
            }
        };
        if offset >= Self::SIZE {
            warn!(
                "{:?} adaptation_field_length {} too large",
                self.pid(),
                self.adaptation_field_length()
            );
            return None;
        }
        Some(offset)
    }

    /// borrow a reference to the underlying 188 bytes of this packet
    pub fn buffer(&self) -> &'buf [u8] {
        self.buf
    }
}

impl<'buf> fmt::Debug for Packet<'buf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("pid", &self.pid())
            .field(
                "payload_unit_start_indicator",
                &self.payload_unit_start_indicator(),
            )
            .field("adaptation_control", &self.adaptation_control())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use crate::packet::*;

    #[test]
    fn pid() {
        assert!(Pid::try_from(0x2000).is_err());
        assert_eq!(Pid::from_masked(0xe100), Pid::new(0x0100));
        assert_eq!(format!("{:?}", Pid::new(0x11)), "Pid(0011)");
    }

    #[test]
    fn too_short() {
        let buf = [Packet::SYNC_BYTE; 100];
        assert!(Packet::try_new(&buf[..]).is_none());
    }

    #[test]
    fn bad_sync() {
        let buf = [0u8; Packet::SIZE];
        assert!(Packet::try_new(&buf[..]).is_none());
    }

    #[test]
    fn test_xmas_tree() {
        let mut buf = [0xffu8; Packet::SIZE];
        buf[0] = Packet::SYNC_BYTE;
        buf[4] = 28; // adaptation_field_length
        let pk = Packet::try_new(&buf[..]).unwrap();
        assert_eq!(u16::from(pk.pid()), 0b1111111111111u16);
        assert!(pk.payload_unit_start_indicator());
        assert_eq!(
            pk.adaptation_control(),
            AdaptationControl::AdaptationFieldAndPayload
        );
        assert_eq!(pk.payload_offset(), Some(4 + 1 + 28));
    }

    #[test]
    fn payload_only() {
        let mut buf = [0u8; Packet::SIZE];
        buf[0] = Packet::SYNC_BYTE;
        buf[3] = 0b0001_0000;
        let pk = Packet::try_new(&buf[..]).unwrap();
        assert_eq!(pk.payload_offset(), Some(FIXED_HEADER_SIZE));
    }

    #[test]
    fn no_payload() {
        let mut buf = [0u8; Packet::SIZE];
        buf[0] = Packet::SYNC_BYTE;
        buf[3] = 0b0010_0000;
        assert_eq!(Packet::try_new(&buf[..]).unwrap().payload_offset(), None);
        buf[3] = 0b0000_0000;
        assert_eq!(Packet::try_new(&buf[..]).unwrap().payload_offset(), None);
    }

    #[test]
    fn adaptation_field_fills_packet() {
        let mut buf = [0u8; Packet::SIZE];
        buf[0] = Packet::SYNC_BYTE;
        buf[3] = 0b0011_0000;
        buf[4] = 183;
        let pk = Packet::try_new(&buf[..]).unwrap();
        assert_eq!(pk.payload_offset(), None);
        buf[4] = 182;
        let pk = Packet::try_new(&buf[..]).unwrap();
        assert_eq!(pk.payload_offset(), Some(187));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut buf = [0u8; 204];
        buf[0] = Packet::SYNC_BYTE;
        buf[3] = 0b0001_0000;
        let pk = Packet::try_new(&buf[..]).unwrap();
        assert_eq!(pk.buffer().len(), Packet::SIZE);
        assert_eq!(PacketSize::try_from(204), Ok(PacketSize::Fec204));
        assert!(PacketSize::try_from(200).is_err());
    }
}
