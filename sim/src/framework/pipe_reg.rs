/// Control tag applied to a pipeline register at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Control {
    /// Latch the value computed last cycle.
    #[default]
    Load,
    /// Keep presenting the current value.
    Stall,
    /// Replace the current value with the bubble payload.
    Bubble,
    /// Stall and bubble were both requested.
    Error,
}

impl Control {
    /// Combine the two hazard signals of one register. Requesting both is
    /// never resolved in favor of either; it yields [`Control::Error`].
    pub fn from_signals(stall: bool, bubble: bool) -> Self {
        match (stall, bubble) {
            (true, true) => Control::Error,
            (true, false) => Control::Stall,
            (false, true) => Control::Bubble,
            (false, false) => Control::Load,
        }
    }
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Control::Load => "LOAD",
            Control::Stall => "STALL",
            Control::Bubble => "BUBBLE",
            Control::Error => "ERROR",
        })
    }
}

/// Payload of a pipeline register.
pub trait StageState: Clone {
    /// The no-op payload inserted by a bubble; also the power-on value.
    fn bubble() -> Self;
}

/// A pipeline register: the payload seen by the stages this cycle
/// (`current`), the payload computed for the next cycle (`next`) and the
/// tag deciding how `next` becomes `current`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeReg<T> {
    pub current: T,
    pub next: T,
    pub control: Control,
}

impl<T: StageState> Default for PipeReg<T> {
    fn default() -> Self {
        Self {
            current: T::bubble(),
            next: T::bubble(),
            control: Control::Load,
        }
    }
}

impl<T: StageState> PipeReg<T> {
    /// Clock edge. Consumes the tag (it resets to `Load`) and returns it.
    /// An `Error` tag fills the register with a bubble.
    pub fn commit(&mut self) -> Control {
        let control = std::mem::take(&mut self.control);
        match control {
            Control::Load => self.current = self.next.clone(),
            Control::Bubble | Control::Error => self.current = T::bubble(),
            Control::Stall => {}
        }
        control
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
