use crate::{Cell, SignalId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A traffic signal occupying a single cell.
///
/// The signal alternates between two phases, flipping whenever the global
/// clock reaches a multiple of its period. There is no amber phase.
#[derive(Clone, Debug)]
pub struct TrafficSignal {
    /// The signal's ID.
    id: SignalId,
    /// The cell the signal occupies.
    cell: Cell,
    /// The current phase.
    phase: SignalPhase,
    /// The number of ticks between phase flips.
    period: u32,
    /// The number of times the signal has flipped.
    flips: u64,
}

/// The phase of a traffic signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SignalPhase {
    /// Traffic may enter the signal's cell.
    Permissive,
    /// Traffic must wait before the signal's cell.
    Restrictive,
}

impl SignalPhase {
    /// The other phase.
    pub fn flipped(self) -> Self {
        match self {
            SignalPhase::Permissive => SignalPhase::Restrictive,
            SignalPhase::Restrictive => SignalPhase::Permissive,
        }
    }

    /// Whether traffic must wait.
    pub fn is_restrictive(self) -> bool {
        self == SignalPhase::Restrictive
    }
}

impl TrafficSignal {
    /// Creates a new signal. The period must be non-zero; layouts are validated
    /// before any signal is created.
    pub(crate) fn new(id: SignalId, cell: Cell, phase: SignalPhase, period: u32) -> Self {
        debug_assert!(period > 0);
        Self {
            id,
            cell,
            phase,
            period,
            flips: 0,
        }
    }

    /// Gets the signal's ID.
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// The cell the signal occupies.
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// The current phase.
    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    /// The number of ticks between phase flips.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// The number of times the signal has changed phase.
    pub fn flips(&self) -> u64 {
        self.flips
    }

    /// Activates the signal once. `elapsed` is the number of ticks completed
    /// before this one, so a signal flips on the very first tick and then
    /// every `period` ticks.
    /// Returns `true` iff the phase changed.
    pub(crate) fn step(&mut self, elapsed: u64) -> bool {
        if elapsed % self.period as u64 == 0 {
            self.phase = self.phase.flipped();
            self.flips += 1;
            true
        } else {
            false
        }
    }
}
