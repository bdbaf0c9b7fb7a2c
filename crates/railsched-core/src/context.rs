use std::collections::HashMap;

/// Length of one simulated day, in ticks.
pub const DAY_LENGTH: u32 = 24_000;

/// Simulation ticks per real-time second.
pub const TICKS_PER_SECOND: u32 = 20;

// ---------------------------------------------------------------------------
// TickContext
// ---------------------------------------------------------------------------

/// One-tick snapshot of the train's surroundings.
///
/// Conditions read from it during `evaluate`; instructions write their
/// requested effects into the trailing slots during `apply`. The host
/// runtime owns filling the snapshot and consuming the effects.
#[derive(Debug, Clone, Default)]
pub struct TickContext {
    /// Ticks into the current day, `0..DAY_LENGTH`.
    pub time_of_day: u32,
    /// Items currently loaded across the train's cargo inventories.
    pub cargo_items: u32,
    /// Fluid currently loaded, in buckets.
    pub fluid_amount: u32,
    /// Seated players.
    pub passengers: u32,
    /// Ticks since the station last moved any cargo.
    pub idle_ticks: u32,
    pub station_powered: bool,
    pub station_unloaded: bool,
    /// Named redstone-link channels and their current state.
    pub signals: HashMap<String, bool>,

    // Effect slots written by instructions.
    pub navigation_target: Option<String>,
    pub train_title: Option<String>,
    pub throttle: Option<f32>,
}

impl TickContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, channel: impl Into<String>, powered: bool) -> Self {
        self.signals.insert(channel.into(), powered);
        self
    }
}
