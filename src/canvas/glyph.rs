//! Box-drawing cell states for connector segments.
//!
//! Every connector cell is described by the set of directions ("arms") it
//! reaches out to. Painting a segment over an existing one takes the union
//! of both arm sets, so a horizontal run crossing a vertical one becomes a
//! cross and a run ending on a vertical becomes a tee.

/// Arm bit flags.
pub const UP: u8 = 0b0001;
pub const DOWN: u8 = 0b0010;
pub const LEFT: u8 = 0b0100;
pub const RIGHT: u8 = 0b1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellGlyph {
    #[default]
    Empty,
    Horizontal,
    Vertical,
    /// ┌
    DownRight,
    /// ┐
    DownLeft,
    /// └
    UpRight,
    /// ┘
    UpLeft,
    /// ├
    TeeRight,
    /// ┤
    TeeLeft,
    /// ┬
    TeeDown,
    /// ┴
    TeeUp,
    Cross,
}

impl CellGlyph {
    pub fn arms(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Horizontal => LEFT | RIGHT,
            Self::Vertical => UP | DOWN,
            Self::DownRight => DOWN | RIGHT,
            Self::DownLeft => DOWN | LEFT,
            Self::UpRight => UP | RIGHT,
            Self::UpLeft => UP | LEFT,
            Self::TeeRight => UP | DOWN | RIGHT,
            Self::TeeLeft => UP | DOWN | LEFT,
            Self::TeeDown => DOWN | LEFT | RIGHT,
            Self::TeeUp => UP | LEFT | RIGHT,
            Self::Cross => UP | DOWN | LEFT | RIGHT,
        }
    }

    /// A single arm still reads as a straight line.
    pub fn from_arms(arms: u8) -> Self {
        let vertical = arms & (UP | DOWN);
        let horizontal = arms & (LEFT | RIGHT);
        match (vertical, horizontal) {
            (0, 0) => Self::Empty,
            (0, _) => Self::Horizontal,
            (_, 0) => Self::Vertical,
            (v, h) if v == UP | DOWN && h == LEFT | RIGHT => Self::Cross,
            (v, RIGHT) if v == UP | DOWN => Self::TeeRight,
            (v, LEFT) if v == UP | DOWN => Self::TeeLeft,
            (DOWN, h) if h == LEFT | RIGHT => Self::TeeDown,
            (UP, h) if h == LEFT | RIGHT => Self::TeeUp,
            (DOWN, RIGHT) => Self::DownRight,
            (DOWN, _) => Self::DownLeft,
            (UP, RIGHT) => Self::UpRight,
            _ => Self::UpLeft,
        }
    }

    pub fn merge(self, other: CellGlyph) -> CellGlyph {
        Self::from_arms(self.arms() | other.arms())
    }

    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Empty => ' ',
            Self::Horizontal => '─',
            Self::Vertical => '│',
            Self::DownRight => '┌',
            Self::DownLeft => '┐',
            Self::UpRight => '└',
            Self::UpLeft => '┘',
            Self::TeeRight => '├',
            Self::TeeLeft => '┤',
            Self::TeeDown => '┬',
            Self::TeeUp => '┴',
            Self::Cross => '┼',
        }
    }
}
