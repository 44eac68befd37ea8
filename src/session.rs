//! Ties the filter bank and the table decoders together for one pass over a transport stream.

use crate::catalog::{ProgramCatalogBuilder, ProgramInfo};
use crate::demultiplex::{
    CompleteSection, FilterError, SectionDecoder, SectionFilterBank, SectionProcessor,
};
use crate::psi::eit::EitDecoder;
use crate::psi::pat::PatDecoder;
use crate::psi::pmt::PmtDecoder;
use crate::psi::sdt::SdtDecoder;
use crate::psi::PsiError;
use crate::source::PacketSource;
use log::{debug, info};
use std::io;

/// The decoders, and the routing of completed sections between them.
#[derive(Debug, Default)]
pub struct Tables {
    pub pat: PatDecoder,
    pub pmt: PmtDecoder,
    pub sdt: SdtDecoder,
    pub eit: EitDecoder,
}

impl SectionProcessor for Tables {
    fn section(
        &mut self,
        bank: &mut SectionFilterBank,
        section: CompleteSection<'_>,
    ) -> Result<(), PsiError> {
        match section.decoder {
            SectionDecoder::Pat => {
                if self.pat.decode(bank, &section)? {
                    let pids = self.pat.program_map_pids();
                    debug!("PAT complete, watching {} PMT PIDs", pids.len());
                    self.pmt.install(bank, &pids)?;
                }
            }
            SectionDecoder::Pmt => {
                self.pmt.decode(bank, &section)?;
            }
            SectionDecoder::Sdt => {
                self.sdt.decode(bank, &section)?;
            }
            SectionDecoder::Eit => {
                self.eit.decode(&section)?;
            }
        }
        Ok(())
    }
}

/// Collects the PSI/SI tables of a single transport stream.
///
/// Filters for the PAT, SDT and EIT are installed on creation; PMT filters follow once the PAT
/// is complete.  EIT events keep accumulating for as long as packets are supplied.
#[derive(Debug)]
pub struct PsiSession {
    bank: SectionFilterBank,
    tables: Tables,
}

impl PsiSession {
    pub fn new() -> Result<PsiSession, FilterError> {
        let mut bank = SectionFilterBank::new();
        let mut tables = Tables::default();
        tables.pat.install(&mut bank)?;
        tables.sdt.install(&mut bank)?;
        tables.eit.install(&mut bank)?;
        Ok(PsiSession { bank, tables })
    }

    /// Reads the source to its end.
    pub fn run<S: PacketSource>(&mut self, source: &mut S) -> io::Result<()> {
        self.bank.run(source, &mut self.tables)?;
        info!(
            "stream finished: channel complete {}, {} EIT events",
            self.is_channel_complete(),
            self.tables.eit.events().len()
        );
        Ok(())
    }

    /// Offers a single packet to the filters.
    pub fn push_packet(&mut self, packet: &[u8]) {
        self.bank.push_packet(packet, &mut self.tables);
    }

    /// `true` once both the PMTs and the SDT are complete, so that a catalog can be built.
    pub fn is_channel_complete(&self) -> bool {
        self.tables.pmt.is_complete() && self.tables.sdt.is_complete()
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn bank(&self) -> &SectionFilterBank {
        &self.bank
    }

    /// Hands the tables collected so far to a `ProgramCatalogBuilder`, leaving the decoders
    /// empty.
    pub fn build_catalog(&mut self) -> Vec<ProgramInfo> {
        let t = &mut self.tables;
        ProgramCatalogBuilder::new(
            t.pat.take_entries(),
            t.pmt.take_programs(),
            t.sdt.take_services(),
            t.eit.take_events(),
        )
        .build()
    }
}
