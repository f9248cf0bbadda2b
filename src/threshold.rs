use std::fmt;

/// Which side of the threshold fires the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Trigger when the value is at or above the threshold
    Above,

    /// Trigger when the value is at or below the threshold
    #[default]
    Below,
}

impl Direction {
    /// Parse a configured direction.
    ///
    /// Only `"above"` selects [`Direction::Above`]; every other string,
    /// including typos, falls back to [`Direction::Below`]. Use
    /// [`Direction::is_known`] to detect the fallback.
    pub fn from_config(raw: &str) -> Direction {
        if raw == "above" {
            Direction::Above
        } else {
            Direction::Below
        }
    }

    /// Whether `raw` is one of the two spelled-out directions
    pub fn is_known(raw: &str) -> bool {
        matches!(raw, "above" | "below")
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Above => write!(f, "above"),
            Direction::Below => write!(f, "below"),
        }
    }
}

/// Decide whether `value` crosses `threshold` in `direction`.
///
/// The boundary is inclusive on both sides.
pub fn should_trigger(value: f64, threshold: f64, direction: Direction) -> bool {
    match direction {
        Direction::Above => value >= threshold,
        Direction::Below => value <= threshold,
    }
}
