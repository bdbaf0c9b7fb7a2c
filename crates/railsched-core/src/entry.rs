use serde_json::Value;
use tracing::warn;

use crate::condition::{ScheduleCondition, UnknownCondition};
use crate::error::{Result, ScheduleError};
use crate::ident::Identifier;
use crate::instruction::{ScheduleInstruction, UnknownInstruction};
use crate::registry::{ConditionRole, ScheduleRegistry};
use crate::tag::{self, Tag};

// ---------------------------------------------------------------------------
// ScheduleEntry
// ---------------------------------------------------------------------------

/// One stop: exactly one instruction plus an ordered list of wait
/// conditions. Condition order is semantically meaningful — the runtime
/// decides the combination semantics, persistence keeps the order exact.
#[derive(Debug)]
pub struct ScheduleEntry {
    pub instruction: Box<dyn ScheduleInstruction>,
    pub conditions: Vec<Box<dyn ScheduleCondition>>,
}

impl ScheduleEntry {
    pub fn new(instruction: Box<dyn ScheduleInstruction>) -> Self {
        Self {
            instruction,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Box<dyn ScheduleCondition>) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Persist as `{ Instruction: { Id, Data }, Conditions: [ { Id, Data }, … ] }`.
    ///
    /// Identifiers are recovered through registry membership of the
    /// variant's concrete type; unknown placeholders re-emit the identifier
    /// and payload they were loaded with.
    pub fn write(&self, registry: &ScheduleRegistry) -> Result<Tag> {
        let mut out = Tag::new();
        out.insert(
            "Instruction".into(),
            Value::Object(write_instruction(registry, self.instruction.as_ref())?),
        );
        out.insert(
            "Conditions".into(),
            tag::write_compound_list(&self.conditions, |condition| {
                write_condition(registry, condition.as_ref())
            })?,
        );
        Ok(out)
    }

    /// Inverse of `write`. Unknown identifiers degrade to placeholders at
    /// the smallest unit — this instruction, or one condition — and are
    /// logged; only a structurally unusable tag is an error, which the
    /// schedule-level loader isolates in turn.
    pub fn from_tag(registry: &ScheduleRegistry, entry_tag: &Tag) -> Result<ScheduleEntry> {
        let instruction_tag = tag::get_object(entry_tag, "Instruction")?;
        let id: Identifier = tag::get_str(instruction_tag, "Id")?.parse()?;
        let data = tag::object_or_empty(instruction_tag, "Data");
        let instruction = load_instruction(registry, id, data);

        let conditions = tag::read_compound_list(entry_tag.get("Conditions"), |condition_tag| {
            load_condition(registry, condition_tag)
        });

        Ok(ScheduleEntry {
            instruction,
            conditions,
        })
    }
}

// ---------------------------------------------------------------------------
// Variant <-> tag plumbing
// ---------------------------------------------------------------------------

fn write_instruction(
    registry: &ScheduleRegistry,
    instruction: &dyn ScheduleInstruction,
) -> Result<Tag> {
    let (id, data) = match instruction.as_any().downcast_ref::<UnknownInstruction>() {
        Some(unknown) => (unknown.id.clone(), unknown.data.clone()),
        None => {
            let id = registry
                .instruction_identifier(instruction.as_any().type_id())
                .ok_or_else(|| ScheduleError::UnregisteredVariant(format!("{instruction:?}")))?
                .clone();
            (id, instruction.save_data())
        }
    };
    Ok(id_data_pair(id, data))
}

fn write_condition(registry: &ScheduleRegistry, condition: &dyn ScheduleCondition) -> Result<Tag> {
    let (id, data) = match condition.as_any().downcast_ref::<UnknownCondition>() {
        Some(unknown) => (unknown.id.clone(), unknown.data.clone()),
        None => {
            let id = registry
                .condition_identifier(condition.as_any().type_id())
                .ok_or_else(|| ScheduleError::UnregisteredVariant(format!("{condition:?}")))?
                .clone();
            (id, condition.save_data())
        }
    };
    Ok(id_data_pair(id, data))
}

fn id_data_pair(id: Identifier, data: Tag) -> Tag {
    let mut out = Tag::new();
    out.insert("Id".into(), Value::String(id.to_string()));
    out.insert("Data".into(), Value::Object(data));
    out
}

fn load_instruction(
    registry: &ScheduleRegistry,
    id: Identifier,
    data: Tag,
) -> Box<dyn ScheduleInstruction> {
    match registry.instruction_factory(&id) {
        Ok(factory) => {
            let mut instruction = factory();
            match instruction.load_data(&data) {
                Ok(()) => instruction,
                Err(err) => {
                    warn!(%id, %err, "instruction data did not load, keeping raw payload");
                    Box::new(UnknownInstruction { id, data })
                }
            }
        }
        Err(_) => {
            warn!(%id, "unknown instruction, substituting placeholder");
            Box::new(UnknownInstruction { id, data })
        }
    }
}

/// `None` drops a condition element whose identifier is unreadable; an
/// unknown-but-readable identifier keeps its slot as a placeholder.
fn load_condition(
    registry: &ScheduleRegistry,
    condition_tag: &Tag,
) -> Option<Box<dyn ScheduleCondition>> {
    let id: Identifier = match tag::get_str(condition_tag, "Id").and_then(|s| s.parse()) {
        Ok(id) => id,
        Err(err) => {
            warn!(%err, "dropping condition with unreadable identifier");
            return None;
        }
    };
    let data = tag::object_or_empty(condition_tag, "Data");
    Some(match registry.condition_factory(ConditionRole::Wait, &id) {
        Ok(factory) => {
            let mut condition = factory();
            match condition.load_data(&data) {
                Ok(()) => condition,
                Err(err) => {
                    warn!(%id, %err, "condition data did not load, keeping raw payload");
                    Box::new(UnknownCondition { id, data })
                }
            }
        }
        Err(_) => {
            warn!(%id, "unknown wait condition, substituting placeholder");
            Box::new(UnknownCondition { id, data })
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
