//! Real wall-clock source. Only used to pick the recovery micro-boost.

use chrono::Timelike;
use vigil_core::WallPhase;

pub trait WallClock: Send + Sync {
    fn hour(&self) -> u32;

    fn phase(&self) -> WallPhase {
        WallPhase::from_hour(self.hour())
    }
}

/// Local time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Pinned hour, for reproducible runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedWallClock(pub u32);

impl WallClock for FixedWallClock {
    fn hour(&self) -> u32 {
        self.0 % 24
    }
}
