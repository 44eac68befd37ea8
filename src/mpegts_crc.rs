//! The CRC-32 variant used to protect PSI/SI sections (polynomial `0x04C11DB7`, MSB-first,
//! initial register `0xFFFFFFFF`, no final XOR).

const POLYNOMIAL: u32 = 0x04C1_1DB7;

const CRC_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Size of the `CRC_32` field that terminates every section protected by a checksum.
pub const CRC_SIZE: usize = 4;

/// Calculates the checksum of the given bytes.
///
/// Running this over a whole section, including its trailing `CRC_32` field, yields `0` for an
/// intact section.
pub fn sum32(data: &[u8]) -> u32 {
    data.iter().fold(0xffff_ffff, |crc, &b| {
        (crc << 8) ^ CRC_TABLE[((crc >> 24) ^ u32::from(b)) as usize]
    })
}

/// Returns `true` if the last 4 bytes of `section` (read big-endian) equal the checksum of all
/// the bytes which precede them.  Sections too short to hold a checksum fail the check.
pub fn check(section: &[u8]) -> bool {
    if section.len() < CRC_SIZE {
        return false;
    }
    let (body, trailer) = section.split_at(section.len() - CRC_SIZE);
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    sum32(body) == expected
}
