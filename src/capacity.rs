use crate::catalog::Room;
use crate::data::Mode;
use crate::error::SeatingError;

/// Derives per-slot seat ceilings from a room's raw capacity.
///
/// `effective = max(raw - buffer, 0)`, `target = floor(effective * ratio(mode))`
/// with a ratio of 1 for Dense and 1/2 for Sparse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlanner {
    buffer: u32,
    mode: Mode,
}

impl CapacityPlanner {
    pub fn new(buffer: i64, mode: Mode) -> Result<Self, SeatingError> {
        if buffer < 0 {
            return Err(SeatingError::InvalidConfiguration(format!(
                "buffer must be non-negative, got {}",
                buffer
            )));
        }
        // a buffer beyond any room capacity zeroes every room
        let buffer = u32::try_from(buffer).unwrap_or(u32::MAX);
        Ok(Self { buffer, mode })
    }

    pub fn buffer(&self) -> u32 {
        self.buffer
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn effective_capacity(&self, room: &Room) -> u32 {
        room.raw_capacity.saturating_sub(self.buffer)
    }

    pub fn target_fill(&self, room: &Room) -> u32 {
        let effective = self.effective_capacity(room);
        match self.mode {
            Mode::Dense => effective,
            Mode::Sparse => effective / 2,
        }
    }
}
