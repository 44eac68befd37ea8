//! Tracks which sections of which tables have been received, so that a decoder can tell when a
//! table is complete, when it has changed version, and when a section is a repeat of one already
//! processed.

use super::{PsiError, TableSyntaxHeader};
use crate::packet::Pid;
use fixedbitset::FixedBitSet;
use log::debug;

const SECTION_NUMBER_COUNT: usize = 256;

/// Reception state of one table, identified by the PID carrying it and its `table_id`.
#[derive(Debug, Clone)]
pub struct TableStatus {
    pid: Pid,
    table_id: u8,
    version: Option<u8>,
    last_section_number: u8,
    sections: FixedBitSet,
}

impl TableStatus {
    fn new(pid: Pid, table_id: u8) -> TableStatus {
        TableStatus {
            pid,
            table_id,
            version: None,
            last_section_number: 0,
            sections: FixedBitSet::with_capacity(SECTION_NUMBER_COUNT),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }
    pub fn table_id(&self) -> u8 {
        self.table_id
    }
    /// `None` until the first section of the table is seen.
    pub fn version(&self) -> Option<u8> {
        self.version
    }
    pub fn last_section_number(&self) -> u8 {
        self.last_section_number
    }

    /// `true` if the given version differs from the one stored (which is always the case before
    /// any section has been seen).
    pub fn version_changed(&self, version: u8) -> bool {
        self.version != Some(version)
    }

    /// Adopts a new version of the table, forgetting every section seen so far.
    pub fn reset(&mut self, version: u8, last_section_number: u8) {
        self.version = Some(version);
        self.last_section_number = last_section_number;
        self.sections.clear();
    }

    pub fn section_seen(&self, section_number: u8) -> bool {
        self.sections.contains(usize::from(section_number))
    }

    /// Records receipt of the given section.  Section numbers beyond `last_section_number()` are
    /// not recorded, and `false` is returned.
    pub fn mark_seen(&mut self, section_number: u8) -> bool {
        if section_number > self.last_section_number {
            return false;
        }
        self.sections.insert(usize::from(section_number));
        true
    }

    /// `true` once as many distinct sections as the table declares have been recorded.  Since
    /// only section numbers up to `last_section_number()` are ever recorded, this means every
    /// section `0..=last_section_number()` has been seen.
    pub fn is_complete(&self) -> bool {
        self.sections.count_ones(..) >= usize::from(self.last_section_number) + 1
    }
}

/// Outcome of offering a section to [`TableStatusTracker::admit()`](struct.TableStatusTracker.html#method.admit).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Admission {
    /// This section was already processed for the current version, and should be ignored.
    Repeat,
    /// The section is new, and should be decoded.  `version_changed` is set if the section
    /// introduced a new version of the table, discarding any progress on the previous one.
    Accepted { version_changed: bool },
}

/// The set of `TableStatus` records for the tables one decoder is collecting.
#[derive(Debug, Default)]
pub struct TableStatusTracker {
    records: Vec<TableStatus>,
}

impl TableStatusTracker {
    pub fn new() -> TableStatusTracker {
        TableStatusTracker::default()
    }

    pub fn exists(&self, pid: Pid, table_id: u8) -> bool {
        self.find(pid, table_id).is_some()
    }

    /// Adds a record with no version and no sections seen.  Registering a table that is already
    /// tracked has no effect, and returns `false`.
    pub fn register(&mut self, pid: Pid, table_id: u8) -> bool {
        if self.exists(pid, table_id) {
            return false;
        }
        self.records.push(TableStatus::new(pid, table_id));
        true
    }

    pub fn find(&self, pid: Pid, table_id: u8) -> Option<&TableStatus> {
        self.records
            .iter()
            .find(|r| r.pid == pid && r.table_id == table_id)
    }

    pub fn find_mut(&mut self, pid: Pid, table_id: u8) -> Option<&mut TableStatus> {
        self.records
            .iter_mut()
            .find(|r| r.pid == pid && r.table_id == table_id)
    }

    /// `true` if at least one table is tracked, and every tracked table is complete.
    pub fn all_complete(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(TableStatus::is_complete)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops all records, once the tables they describe are no longer being collected.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Applies the version / repeat gating shared by the table decoders to a newly arrived
    /// section:
    ///
    ///  1. the table must have been registered, else `PsiError::NoTableStatus`
    ///  2. a new `version_number` resets the record
    ///  3. a `section_number` beyond `last_section_number` is rejected
    ///  4. a section already seen for this version is a `Repeat`
    ///  5. otherwise the section is marked as seen and `Accepted`
    pub fn admit(
        &mut self,
        pid: Pid,
        table_id: u8,
        syntax: &TableSyntaxHeader<'_>,
    ) -> Result<Admission, PsiError> {
        let record = self
            .find_mut(pid, table_id)
            .ok_or(PsiError::NoTableStatus { pid, table_id })?;
        let version_changed = record.version_changed(syntax.version());
        if version_changed {
            debug!(
                "{:?} table_id {:#04x}: version {:?} -> {}",
                pid,
                table_id,
                record.version(),
                syntax.version()
            );
            record.reset(syntax.version(), syntax.last_section_number());
        }
        let section_number = syntax.section_number();
        if section_number > record.last_section_number() {
            return Err(PsiError::SectionNumberOutOfRange {
                section_number,
                last_section_number: record.last_section_number(),
            });
        }
        if record.section_seen(section_number) {
            return Ok(Admission::Repeat);
        }
        record.mark_seen(section_number);
        Ok(Admission::Accepted { version_changed })
    }
}
