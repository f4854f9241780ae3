/// Simulated minutes added on every tick.
pub const SIM_MINUTES_PER_TICK: f64 = 5.0;
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Simulated day phase, derived only from the simulated clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DayPhase {
    Night,
    Morning,
    Day,
    Evening,
}

impl DayPhase {
    pub const ALL: [DayPhase; 4] = [
        DayPhase::Night,
        DayPhase::Morning,
        DayPhase::Day,
        DayPhase::Evening,
    ];

    /// `[0,360)` night, `[360,720)` morning, `[720,1080)` day, `[1080,1440)` evening.
    pub fn from_day_minute(minute: f64) -> Self {
        if minute < 360.0 {
            DayPhase::Night
        } else if minute < 720.0 {
            DayPhase::Morning
        } else if minute < 1080.0 {
            DayPhase::Day
        } else {
            DayPhase::Evening
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DayPhase::Night => "night",
            DayPhase::Morning => "morning",
            DayPhase::Day => "day",
            DayPhase::Evening => "evening",
        }
    }

    pub fn index(self) -> usize {
        match self {
            DayPhase::Night => 0,
            DayPhase::Morning => 1,
            DayPhase::Day => 2,
            DayPhase::Evening => 3,
        }
    }
}

/// Coarse real-world phase. It may only scale passive recovery, never gate actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WallPhase {
    Day,
    Night,
}

impl WallPhase {
    pub fn from_hour(hour: u32) -> Self {
        if hour < 6 || hour >= 22 {
            WallPhase::Night
        } else {
            WallPhase::Day
        }
    }

    /// Multiplier applied to passive recovery deltas (bounded to +10%).
    pub fn recovery_boost(self) -> f64 {
        match self {
            WallPhase::Night => 1.10,
            WallPhase::Day => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WallPhase::Day => "day",
            WallPhase::Night => "night",
        }
    }
}

/// Logical simulation clock. Ticks and simulated minutes only ever move forward together.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    tick: u64,
    sim_minutes: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a persisted clock. Negative minutes are treated as zero.
    pub fn restore(tick: u64, sim_minutes: f64) -> Self {
        Self {
            tick,
            sim_minutes: sim_minutes.max(0.0),
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
        self.sim_minutes += SIM_MINUTES_PER_TICK;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn sim_minutes(&self) -> f64 {
        self.sim_minutes
    }

    pub fn day_minute(&self) -> f64 {
        self.sim_minutes % MINUTES_PER_DAY
    }

    pub fn day_index(&self) -> u64 {
        (self.sim_minutes / MINUTES_PER_DAY).floor() as u64
    }

    pub fn phase(&self) -> DayPhase {
        DayPhase::from_day_minute(self.day_minute())
    }

    /// Number of ticks in one simulated day.
    pub fn ticks_per_day() -> u64 {
        (MINUTES_PER_DAY / SIM_MINUTES_PER_TICK) as u64
    }
}
