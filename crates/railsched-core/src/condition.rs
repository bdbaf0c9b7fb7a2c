use std::any::Any;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::context::{TickContext, DAY_LENGTH, TICKS_PER_SECOND};
use crate::error::{Result, ScheduleError};
use crate::ident::Identifier;
use crate::tag::{self, Tag};

// ---------------------------------------------------------------------------
// ScheduleCondition
// ---------------------------------------------------------------------------

/// One registered condition kind, usable as a wait gate (true = proceed)
/// or a skip gate (true = skip the entry), depending on which catalog the
/// runtime resolved it from.
pub trait ScheduleCondition: fmt::Debug + Send + Sync {
    /// Serialized configuration and running state. `load_data` must be its
    /// exact inverse for every value the variant can produce.
    fn save_data(&self) -> Tag;

    fn load_data(&mut self, data: &Tag) -> Result<()>;

    /// Called once per tick. Pure with respect to persisted state except
    /// for variants that explicitly accumulate progress.
    fn evaluate(&mut self, ctx: &TickContext) -> bool;

    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// TimeUnit / Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Ticks,
    Seconds,
    Minutes,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Ticks => "ticks",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
        }
    }

    pub fn in_ticks(self, value: u32) -> u32 {
        match self {
            TimeUnit::Ticks => value,
            TimeUnit::Seconds => value.saturating_mul(TICKS_PER_SECOND),
            TimeUnit::Minutes => value.saturating_mul(60 * TICKS_PER_SECOND),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ticks" => Ok(TimeUnit::Ticks),
            "seconds" => Ok(TimeUnit::Seconds),
            "minutes" => Ok(TimeUnit::Minutes),
            _ => Err(ScheduleError::MalformedTag(format!(
                "unknown time unit '{s}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    Equal,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Greater => "greater",
            Comparison::Less => "less",
            Comparison::Equal => "equal",
        }
    }

    pub fn test(self, lhs: u32, rhs: u32) -> bool {
        match self {
            Comparison::Greater => lhs > rhs,
            Comparison::Less => lhs < rhs,
            Comparison::Equal => lhs == rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "greater" => Ok(Comparison::Greater),
            "less" => Ok(Comparison::Less),
            "equal" => Ok(Comparison::Equal),
            _ => Err(ScheduleError::MalformedTag(format!(
                "unknown comparison '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduledDelay
// ---------------------------------------------------------------------------

/// Wait a fixed span after arriving. The running tick counter is part of
/// the persisted state, so an interrupted wait resumes where it left off.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledDelay {
    pub value: u32,
    pub unit: TimeUnit,
    elapsed: u32,
}

impl ScheduledDelay {
    pub fn new(value: u32, unit: TimeUnit) -> Self {
        Self {
            value,
            unit,
            elapsed: 0,
        }
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed
    }
}

impl Default for ScheduledDelay {
    fn default() -> Self {
        Self::new(5, TimeUnit::Seconds)
    }
}

impl ScheduleCondition for ScheduledDelay {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Value".into(), Value::from(self.value));
        data.insert("Unit".into(), Value::String(self.unit.as_str().into()));
        data.insert("Elapsed".into(), Value::from(self.elapsed));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.value = tag::get_u32(data, "Value")?;
        self.unit = tag::get_str(data, "Unit")?.parse()?;
        self.elapsed = tag::u32_or(data, "Elapsed", 0);
        Ok(())
    }

    fn evaluate(&mut self, _ctx: &TickContext) -> bool {
        self.elapsed = self.elapsed.saturating_add(1);
        self.elapsed >= self.unit.in_ticks(self.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// TimeOfDayCondition
// ---------------------------------------------------------------------------

const TICKS_PER_HOUR: u32 = DAY_LENGTH / 24;

/// Departure window in ticks; the gate stays open this long after the
/// scheduled time so a train arriving mid-window still departs.
const DEPARTURE_WINDOW: u32 = 15 * TICKS_PER_SECOND;

/// Wait for a time of day, optionally repeating every `rotation` hours
/// (0 = once per day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeOfDayCondition {
    pub hour: u32,
    pub minute: u32,
    pub rotation: u32,
}

impl TimeOfDayCondition {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            hour: hour % 24,
            minute: minute % 60,
            rotation: 0,
        }
    }

    pub fn rotating(mut self, hours: u32) -> Self {
        self.rotation = hours;
        self
    }

    fn target_tick(&self) -> u32 {
        (self.hour % 24) * TICKS_PER_HOUR + (self.minute % 60) * TICKS_PER_HOUR / 60
    }
}

impl ScheduleCondition for TimeOfDayCondition {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Hour".into(), Value::from(self.hour));
        data.insert("Minute".into(), Value::from(self.minute));
        data.insert("Rotation".into(), Value::from(self.rotation));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.hour = tag::get_u32(data, "Hour")? % 24;
        self.minute = tag::get_u32(data, "Minute")? % 60;
        self.rotation = tag::u32_or(data, "Rotation", 0);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        let period = match self.rotation {
            0 => DAY_LENGTH,
            hours => (hours * TICKS_PER_HOUR).min(DAY_LENGTH),
        };
        let now = ctx.time_of_day % period;
        let target = self.target_tick() % period;
        let offset = (now + period - target) % period;
        offset < DEPARTURE_WINDOW
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// ItemThresholdCondition / FluidThresholdCondition
// ---------------------------------------------------------------------------

/// Gate on the loaded item count crossing a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemThresholdCondition {
    pub operator: Comparison,
    pub threshold: u32,
    pub item: String,
}

impl Default for ItemThresholdCondition {
    fn default() -> Self {
        Self {
            operator: Comparison::Greater,
            threshold: 0,
            item: String::new(),
        }
    }
}

impl ScheduleCondition for ItemThresholdCondition {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert(
            "Operator".into(),
            Value::String(self.operator.as_str().into()),
        );
        data.insert("Threshold".into(), Value::from(self.threshold));
        data.insert("Item".into(), Value::String(self.item.clone()));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.operator = tag::get_str(data, "Operator")?.parse()?;
        self.threshold = tag::get_u32(data, "Threshold")?;
        self.item = tag::get_str(data, "Item")?.to_string();
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        self.operator.test(ctx.cargo_items, self.threshold)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Gate on the loaded fluid amount, in buckets, crossing a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidThresholdCondition {
    pub operator: Comparison,
    pub threshold: u32,
    pub fluid: String,
}

impl Default for FluidThresholdCondition {
    fn default() -> Self {
        Self {
            operator: Comparison::Greater,
            threshold: 0,
            fluid: String::new(),
        }
    }
}

impl ScheduleCondition for FluidThresholdCondition {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert(
            "Operator".into(),
            Value::String(self.operator.as_str().into()),
        );
        data.insert("Threshold".into(), Value::from(self.threshold));
        data.insert("Fluid".into(), Value::String(self.fluid.clone()));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.operator = tag::get_str(data, "Operator")?.parse()?;
        self.threshold = tag::get_u32(data, "Threshold")?;
        self.fluid = tag::get_str(data, "Fluid")?.to_string();
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        self.operator.test(ctx.fluid_amount, self.threshold)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// RedstoneLinkCondition
// ---------------------------------------------------------------------------

/// Gate on a named signal channel being powered (or unpowered when
/// inverted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedstoneLinkCondition {
    pub channel: String,
    pub inverted: bool,
}

impl RedstoneLinkCondition {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            inverted: false,
        }
    }
}

impl ScheduleCondition for RedstoneLinkCondition {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Channel".into(), Value::String(self.channel.clone()));
        data.insert("Inverted".into(), Value::Bool(self.inverted));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.channel = tag::get_str(data, "Channel")?.to_string();
        self.inverted = tag::get_bool(data, "Inverted")?;
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        let powered = ctx.signals.get(&self.channel).copied().unwrap_or(false);
        powered != self.inverted
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// PlayerCountCondition
// ---------------------------------------------------------------------------

/// Gate on seated players: at least `count`, or exactly `count` when
/// `exact` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerCountCondition {
    pub count: u32,
    pub exact: bool,
}

impl PlayerCountCondition {
    pub fn at_least(count: u32) -> Self {
        Self {
            count,
            exact: false,
        }
    }
}

impl ScheduleCondition for PlayerCountCondition {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Count".into(), Value::from(self.count));
        data.insert("Exact".into(), Value::Bool(self.exact));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.count = tag::get_u32(data, "Count")?;
        self.exact = tag::get_bool(data, "Exact")?;
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        if self.exact {
            ctx.passengers == self.count
        } else {
            ctx.passengers >= self.count
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// IdleCargoCondition
// ---------------------------------------------------------------------------

/// Wait until the station has moved no cargo for the configured span.
/// Unlike `ScheduledDelay`, the idle clock is the station's, not the
/// condition's, so nothing accumulates here.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleCargoCondition {
    pub value: u32,
    pub unit: TimeUnit,
}

impl Default for IdleCargoCondition {
    fn default() -> Self {
        Self {
            value: 10,
            unit: TimeUnit::Seconds,
        }
    }
}

impl ScheduleCondition for IdleCargoCondition {
    fn save_data(&self) -> Tag {
        let mut data = Tag::new();
        data.insert("Value".into(), Value::from(self.value));
        data.insert("Unit".into(), Value::String(self.unit.as_str().into()));
        data
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.value = tag::get_u32(data, "Value")?;
        self.unit = tag::get_str(data, "Unit")?.parse()?;
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        ctx.idle_ticks >= self.unit.in_ticks(self.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// StationUnloadedCondition / StationPoweredCondition
// ---------------------------------------------------------------------------

/// Gate on the station reporting all cargo unloaded. No configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationUnloadedCondition;

impl ScheduleCondition for StationUnloadedCondition {
    fn save_data(&self) -> Tag {
        Tag::new()
    }

    fn load_data(&mut self, _data: &Tag) -> Result<()> {
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        ctx.station_unloaded
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Gate on the station block being redstone-powered. No configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationPoweredCondition;

impl ScheduleCondition for StationPoweredCondition {
    fn save_data(&self) -> Tag {
        Tag::new()
    }

    fn load_data(&mut self, _data: &Tag) -> Result<()> {
        Ok(())
    }

    fn evaluate(&mut self, ctx: &TickContext) -> bool {
        ctx.station_powered
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// UnknownCondition
// ---------------------------------------------------------------------------

/// Placeholder substituted when a condition identifier is not registered at
/// load time. Never proceeds and never skips; keeps the foreign identifier
/// and payload verbatim so a later save loses nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownCondition {
    pub id: Identifier,
    pub data: Tag,
}

impl ScheduleCondition for UnknownCondition {
    fn save_data(&self) -> Tag {
        self.data.clone()
    }

    fn load_data(&mut self, data: &Tag) -> Result<()> {
        self.data = data.clone();
        Ok(())
    }

    fn evaluate(&mut self, _ctx: &TickContext) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
