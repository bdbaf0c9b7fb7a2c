use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::entry::ScheduleEntry;
use crate::error::{Result, ScheduleError};
use crate::ident::Identifier;
use crate::instruction::UnknownInstruction;
use crate::registry::ScheduleRegistry;
use crate::tag::{self, Tag};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Ordered, optionally cyclic itinerary of stops, with a persisted cursor
/// marking where execution should resume.
///
/// `saved_progress` is deliberately never clamped by edits or by loading:
/// the field round-trips bit-exactly, and interpreting a stale value is the
/// runtime's decision (`resume_index` is the one policy offered here).
#[derive(Debug)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
    pub cyclic: bool,
    pub saved_progress: usize,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    /// A fresh schedule: no stops, cyclic, progress at the first entry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cyclic: true,
            saved_progress: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Persist as `{ Entries, Cyclic, Progress }`. `Progress` is emitted
    /// only when greater than zero; zero is the implicit default.
    pub fn write(&self, registry: &ScheduleRegistry) -> Result<Tag> {
        let mut out = Tag::new();
        out.insert(
            "Entries".into(),
            tag::write_compound_list(&self.entries, |entry| entry.write(registry))?,
        );
        out.insert("Cyclic".into(), Value::Bool(self.cyclic));
        if self.saved_progress > 0 {
            out.insert("Progress".into(), Value::from(self.saved_progress as u64));
        }
        Ok(out)
    }

    /// Inverse of `write`. Total: corrupted input degrades entry by entry
    /// (placeholder substitution, logged) but always yields a usable
    /// schedule. Absent fields take the host format's defaults — no
    /// entries, not cyclic, progress zero.
    pub fn from_tag(registry: &ScheduleRegistry, schedule_tag: &Tag) -> Schedule {
        let entries = tag::read_compound_list(schedule_tag.get("Entries"), |entry_tag| {
            Some(match ScheduleEntry::from_tag(registry, entry_tag) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "malformed schedule entry, substituting placeholder");
                    placeholder_entry(entry_tag)
                }
            })
        });
        Schedule {
            entries,
            cyclic: schedule_tag
                .get("Cyclic")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            saved_progress: schedule_tag
                .get("Progress")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
        }
    }

    /// Write to a file as pretty JSON, atomically.
    pub fn save_file(&self, registry: &ScheduleRegistry, path: &Path) -> Result<()> {
        let tag = self.write(registry)?;
        let data = serde_json::to_string_pretty(&Value::Object(tag))?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Read a schedule file written by `save_file`. I/O and JSON syntax
    /// errors surface; tag-level corruption degrades per `from_tag`.
    pub fn load_file(registry: &ScheduleRegistry, path: &Path) -> Result<Schedule> {
        let data = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&data)?;
        let schedule_tag = value.as_object().ok_or_else(|| {
            ScheduleError::MalformedTag("schedule file root is not a compound".into())
        })?;
        Ok(Schedule::from_tag(registry, schedule_tag))
    }

    // -----------------------------------------------------------------------
    // Sequence edits
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_entry(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    /// Insert at `index`, clamped to the end of the sequence.
    pub fn insert_entry(&mut self, index: usize, entry: ScheduleEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    pub fn remove_entry(&mut self, index: usize) -> Option<ScheduleEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Move the entry at `from` so it sits at `to`. Out-of-bounds indices
    /// leave the sequence untouched.
    pub fn move_entry(&mut self, from: usize, to: usize) {
        if from >= self.entries.len() || to >= self.entries.len() {
            return;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // -----------------------------------------------------------------------
    // Progress policy
    // -----------------------------------------------------------------------

    /// The entry index execution should resume from, with stale cursors
    /// resolved: wrap around when cyclic, hold at the final stop when not.
    /// `None` when there are no stops at all.
    pub fn resume_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        if self.saved_progress < self.entries.len() {
            return Some(self.saved_progress);
        }
        if self.cyclic {
            Some(self.saved_progress % self.entries.len())
        } else {
            Some(self.entries.len() - 1)
        }
    }
}

fn placeholder_entry(raw: &Tag) -> ScheduleEntry {
    ScheduleEntry::new(Box::new(UnknownInstruction {
        id: Identifier::local("unknown"),
        data: raw.clone(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
