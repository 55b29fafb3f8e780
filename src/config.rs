/// Rate the delay and sound timers count down at
pub const TIMER_FREQ: u32 = 60;

/// Instructions per second assumed when nothing else is configured
pub const DEFAULT_INSTRUCTION_RATE: u32 = 500;

/// Machine settings chosen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// How many times per second the host calls `step()`. The timers are derived
    /// from this, so it should match the host's real pacing.
    pub instruction_rate: u32,
}

impl MachineConfig {
    /// Number of `step()` calls between two timer ticks, never less than one
    pub fn steps_per_timer_tick(&self) -> u32 {
        (self.instruction_rate / TIMER_FREQ).max(1)
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            instruction_rate: DEFAULT_INSTRUCTION_RATE,
        }
    }
}
