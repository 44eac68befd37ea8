//! Builders for the sections and packets used by unit tests throughout the crate.

use crate::mpegts_crc;
use crate::packet::Packet;
use bitstream_io::{BigEndian, BitWrite};
use bitstream_io::{BitWriter, BE};
use std::io;

pub fn make_test_data<F>(builder: F) -> Vec<u8>
where
    F: Fn(&mut BitWriter<Vec<u8>, BE>) -> Result<(), io::Error>,
{
    let data: Vec<u8> = Vec::new();
    let mut w = BitWriter::endian(data, BigEndian);
    builder(&mut w).unwrap();
    w.into_writer()
}

/// A section using section syntax, with a correct CRC appended.
pub fn section(
    table_id: u8,
    id: u16,
    version: u8,
    section_number: u8,
    last_section_number: u8,
    body: &[u8],
) -> Vec<u8> {
    let section_length = 5 + body.len() + mpegts_crc::CRC_SIZE;
    let mut data = make_test_data(|w| {
        w.write(8, table_id)?;
        w.write_bit(true)?; // section_syntax_indicator
        w.write_bit(false)?; // private_indicator
        w.write(2, 0b11u8)?; // reserved
        w.write(12, section_length as u16)?;
        w.write(16, id)?;
        w.write(2, 0b11u8)?; // reserved
        w.write(5, version)?;
        w.write_bit(true)?; // current_next_indicator
        w.write(8, section_number)?;
        w.write(8, last_section_number)?;
        Ok(())
    });
    data.extend_from_slice(body);
    let crc = mpegts_crc::sum32(&data);
    data.extend_from_slice(&crc.to_be_bytes());
    data
}

/// Splits a section into 188 byte packets on the given PID, the first carrying
/// payload_unit_start_indicator and a zero pointer_field, and the last padded with `0xff`.
pub fn packetize(pid: u16, section: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = section;
    let mut first = true;
    let mut cc = 0u8;
    while first || !rest.is_empty() {
        let mut pk = make_test_data(|w| {
            w.write(8, Packet::SYNC_BYTE)?;
            w.write_bit(false)?; // transport_error_indicator
            w.write_bit(first)?; // payload_unit_start_indicator
            w.write_bit(false)?; // transport_priority
            w.write(13, pid)?;
            w.write(2, 0u8)?; // transport_scrambling_control
            w.write(2, 0b01u8)?; // adaptation_field_control: payload only
            w.write(4, cc)?;
            Ok(())
        });
        if first {
            pk.push(0); // pointer_field
        }
        let n = rest.len().min(Packet::SIZE - pk.len());
        pk.extend_from_slice(&rest[..n]);
        rest = &rest[n..];
        pk.resize(Packet::SIZE, 0xff);
        out.extend_from_slice(&pk);
        first = false;
        cc = (cc + 1) & 0xf;
    }
    out
}

/// Iterates the 188 byte packets within `data`.
pub fn packets(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.chunks_exact(Packet::SIZE)
}

/// PAT body listing `(program_number, program_map_pid)` pairs.
pub fn pat_body(programs: &[(u16, u16)]) -> Vec<u8> {
    make_test_data(|w| {
        for &(program_number, pid) in programs {
            w.write(16, program_number)?;
            w.write(3, 0b111u8)?; // reserved
            w.write(13, pid)?;
        }
        Ok(())
    })
}

/// PMT body with the given program info descriptors and `(stream_type, pid, ES_info)` entries.
pub fn pmt_body(pcr_pid: u16, program_info: &[u8], streams: &[(u8, u16, &[u8])]) -> Vec<u8> {
    let mut data = make_test_data(|w| {
        w.write(3, 0b111u8)?; // reserved
        w.write(13, pcr_pid)?;
        w.write(4, 0b1111u8)?; // reserved
        w.write(12, program_info.len() as u16)?;
        Ok(())
    });
    data.extend_from_slice(program_info);
    for &(stream_type, pid, es_info) in streams {
        data.extend(make_test_data(|w| {
            w.write(8, stream_type)?;
            w.write(3, 0b111u8)?; // reserved
            w.write(13, pid)?;
            w.write(4, 0b1111u8)?; // reserved
            w.write(12, es_info.len() as u16)?;
            Ok(())
        }));
        data.extend_from_slice(es_info);
    }
    data
}

/// A _service_descriptor_ with the given names.
pub fn service_descriptor(service_type: u8, provider: &[u8], name: &[u8]) -> Vec<u8> {
    let mut d = vec![0x48, (3 + provider.len() + name.len()) as u8, service_type];
    d.push(provider.len() as u8);
    d.extend_from_slice(provider);
    d.push(name.len() as u8);
    d.extend_from_slice(name);
    d
}

/// SDT body with `(service_id, descriptors)` entries, each marked as running with an EIT
/// schedule.
pub fn sdt_body(original_network_id: u16, services: &[(u16, &[u8])]) -> Vec<u8> {
    let mut data = make_test_data(|w| {
        w.write(16, original_network_id)?;
        w.write(8, 0xffu8)?; // reserved_future_use
        Ok(())
    });
    for &(service_id, descriptors) in services {
        data.extend(make_test_data(|w| {
            w.write(16, service_id)?;
            w.write(6, 0b11_1111u8)?; // reserved_future_use
            w.write_bit(true)?; // EIT_schedule_flag
            w.write_bit(false)?; // EIT_present_following_flag
            w.write(3, 4u8)?; // running_status
            w.write_bit(false)?; // free_CA_mode
            w.write(12, descriptors.len() as u16)?;
            Ok(())
        }));
        data.extend_from_slice(descriptors);
    }
    data
}

/// A _short_event_descriptor_ with the given language, name and text.
pub fn short_event_descriptor(language: &[u8; 3], name: &[u8], text: &[u8]) -> Vec<u8> {
    let mut d = vec![0x4d, (5 + name.len() + text.len()) as u8];
    d.extend_from_slice(language);
    d.push(name.len() as u8);
    d.extend_from_slice(name);
    d.push(text.len() as u8);
    d.extend_from_slice(text);
    d
}

pub struct EventSpec<'a> {
    pub event_id: u16,
    pub start_time: u64,
    pub duration: u32,
    pub descriptors: &'a [u8],
}

/// EIT body for the given events, each marked as running.
pub fn eit_body(
    transport_stream_id: u16,
    original_network_id: u16,
    events: &[EventSpec<'_>],
) -> Vec<u8> {
    let mut data = make_test_data(|w| {
        w.write(16, transport_stream_id)?;
        w.write(16, original_network_id)?;
        w.write(8, 0u8)?; // segment_last_section_number
        w.write(8, 0x4eu8)?; // last_table_id
        Ok(())
    });
    for e in events {
        data.extend(make_test_data(|w| {
            w.write(16, e.event_id)?;
            w.write(40, e.start_time)?;
            w.write(24, e.duration)?;
            w.write(3, 4u8)?; // running_status
            w.write_bit(false)?; // free_CA_mode
            w.write(12, e.descriptors.len() as u16)?;
            Ok(())
        }));
        data.extend_from_slice(e.descriptors);
    }
    data
}
