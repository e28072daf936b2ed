/// Number of distinct control combinations: every subset of {up, left, right}
pub const ACTION_COUNT: usize = 1 << 3;

/// Control inputs held during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Action {
    pub up: bool,
    pub left: bool,
    pub right: bool,
}

impl Action {
    pub const IDLE: Self = Self::new(false, false, false);

    pub const fn new(up: bool, left: bool, right: bool) -> Self {
        Self { up, left, right }
    }

    /// Decode an action bitmask, bit 0 = up, bit 1 = left, bit 2 = right
    ///
    /// Bits above the third are ignored.
    pub const fn from_mask(mask: usize) -> Self {
        Self {
            up: mask & 1 != 0,
            left: mask & 2 != 0,
            right: mask & 4 != 0,
        }
    }

    /// Encode as a bitmask in `[0, ACTION_COUNT)`
    pub const fn mask(self) -> usize {
        self.up as usize | (self.left as usize) << 1 | (self.right as usize) << 2
    }
}

impl From<usize> for Action {
    fn from(mask: usize) -> Self {
        Self::from_mask(mask)
    }
}

impl From<Action> for usize {
    fn from(action: Action) -> Self {
        action.mask()
    }
}
