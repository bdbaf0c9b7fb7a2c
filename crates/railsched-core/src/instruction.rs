use std::any::Any;
use std::fmt;

use serde_json::Value;

use crate::context::TickContext;
use crate::error::Result;
use crate::ident::Identifier;
use crate::tag::{self, Tag};

// ---------------------------------------------------------------------------
// ScheduleInstruction
// ---------------------------------------------------------------------------

/// One registered instruction kind: what the train should do at a stop.
///
/// Implementations hold their own mutable configuration. They are not
/// self-identified; the registry recovers the identifier from the concrete
/// type when an entry is written.
pub trait ScheduleInstruction: fmt::Debug + Send + Sync {
    /// Serialized configuration. `load_data` must be its exact inverse for
    /// every value the variant can produce.
    fn save_data(&self) -> Tag;

    fn load_data(&mut self, data: &Tag) -> Result<()>;

    /// Request the instruction's effect by writing into the context. The
    /// physical consequence is the host runtime's business.
    fn apply(&self, ctx: &mut TickContext);

    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// DestinationInstruction
// ---------------------------------------------------------------------------

/// Drive to the first station whose name matches the target filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestinationInstruction {
    pub target: String,
}

impl DestinationInstruction {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl ScheduleInstruction for DestinationInstruction {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Text".into(), Value::String(self.target.clone()));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.target = tag::get_str(data, "Text")?.to_string();
        Ok(())
    }

    fn apply(&self, ctx: &mut TickContext) {
        ctx.navigation_target = Some(self.target.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// RenameInstruction
// ---------------------------------------------------------------------------

/// Change the train's displayed title without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenameInstruction {
    pub title: String,
}

impl RenameInstruction {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl ScheduleInstruction for RenameInstruction {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Title".into(), Value::String(self.title.clone()));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.title = tag::get_str(data, "Title")?.to_string();
        Ok(())
    }

    fn apply(&self, ctx: &mut TickContext) {
        ctx.train_title = Some(self.title.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ThrottleInstruction
// ---------------------------------------------------------------------------

/// Limit the train's top speed to a fraction of its maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleInstruction {
    /// `0.0..=1.0`; values outside the range are clamped on load.
    pub throttle: f32,
}

impl ThrottleInstruction {
    pub fn new(throttle: f32) -> Self {
        Self {
            throttle: throttle.clamp(0.0, 1.0),
        }
    }
}

impl Default for ThrottleInstruction {
    fn default() -> Self {
        Self { throttle: 1.0 }
    }
}

impl ScheduleInstruction for ThrottleInstruction {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Throttle".into(), Value::from(f64::from(self.throttle)));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.throttle = tag::get_f32(data, "Throttle")?.clamp(0.0, 1.0);
        Ok(())
    }

    fn apply(&self, ctx: &mut TickContext) {
        ctx.throttle = Some(self.throttle);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// UnknownInstruction
// ---------------------------------------------------------------------------

/// Placeholder substituted when an instruction identifier is not registered
/// at load time. Does nothing when applied; keeps the foreign identifier and
/// payload verbatim so a later save loses nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownInstruction {
    pub id: Identifier,
    pub data: Tag,
}

impl ScheduleInstruction for UnknownInstruction {
    fn save_data(&self) -> Tag {
        self.data.clone()
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.data = data.clone();
        Ok(())
    }

    fn apply(&self, _ctx: &mut TickContext) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
