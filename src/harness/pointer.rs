use kurbo::Point;

/// Pointer input normalized at the host boundary.
///
/// Mouse and touch collapse into this one model; only the primary pointer is
/// represented. Positions are surface-local logical coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Press { position: Point },
    Move { position: Point },
    Release,
}

/// Live pointer state over the sketch surface. Read-only to sketches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    /// Last known position in surface-local coordinates.
    pub position: Point,
    /// Position scaled to `[0, 1]` per axis.
    pub normalized: Point,
    /// Whether the pointer has ever been seen over the surface.
    pub has_entered: bool,
    /// Whether the primary button/touch is currently held.
    pub is_down: bool,
    /// True once no movement has been seen for the configured timeout.
    pub is_idle: bool,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            position: Point::ORIGIN,
            normalized: Point::ORIGIN,
            has_entered: false,
            is_down: false,
            is_idle: true,
        }
    }
}
