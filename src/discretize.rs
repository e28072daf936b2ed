use crate::{
    error::{ensure, Error, Result},
    gym::{ArenaConfig, Observation},
};

/// How one observation component is bucketed
///
/// The raw value is divided by `scale`, clamped to `[lo, hi]` and mapped linearly
/// onto `0..buckets`, rounding to the nearest bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    pub scale: f32,
    pub lo: f32,
    pub hi: f32,
    pub buckets: usize,
}

impl Axis {
    pub const fn new(scale: f32, lo: f32, hi: f32, buckets: usize) -> Self {
        Self {
            scale,
            lo,
            hi,
            buckets,
        }
    }

    fn validate(&self, dim: usize) -> Result<()> {
        let &Self {
            scale,
            lo,
            hi,
            buckets,
        } = self;
        ensure(buckets > 0, || format!("Axis {dim} needs at least one bucket"))?;
        // a negative scale would flip the axis and undersize the table
        ensure(scale.is_finite() && scale > 0.0, || {
            format!("Axis {dim} scale must be finite and positive, got {scale}")
        })?;
        ensure(lo.is_finite() && hi.is_finite() && lo < hi, || {
            format!("Axis {dim} range [{lo}, {hi}] is empty or unbounded")
        })
    }

    /// Bucket of `value`; total over `f32`, NaN falls into the lowest bucket
    pub fn bucket(&self, value: f32) -> usize {
        let normalized = value / self.scale;
        let clamped = if normalized.is_nan() {
            self.lo
        } else {
            normalized.clamp(self.lo, self.hi)
        };
        let fraction = (clamped - self.lo) / (self.hi - self.lo);
        let top = self.buckets - 1;
        ((fraction * top as f32).round() as usize).min(top)
    }
}

/// Bucketing of all six observation components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub axes: [Axis; 6],
}

impl Grid {
    /// Grid scaled to an arena: positions by its size, horizontal speed by its limit,
    /// vertical speed by the jump speed. The fruit axes get `2 * pos_steps - 1` buckets.
    pub fn for_arena(config: &ArenaConfig, pos_steps: usize, vel_steps: usize) -> Self {
        let fruit_steps = (2 * pos_steps).saturating_sub(1);
        Self {
            axes: [
                Axis::new(config.width, -0.5, 0.5, pos_steps),
                Axis::new(config.height, -0.5, 0.5, pos_steps),
                Axis::new(config.max_speed_x, -1.0, 1.0, vel_steps),
                Axis::new(config.jump_speed, -3.0, 1.0, vel_steps),
                Axis::new(config.width, -0.5, 0.5, fruit_steps),
                Axis::new(config.height, -0.5, 0.5, fruit_steps),
            ],
        }
    }

    /// Number of discrete states
    pub fn states(&self) -> Option<usize> {
        self.axes
            .iter()
            .try_fold(1usize, |acc, axis| acc.checked_mul(axis.buckets))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::for_arena(&ArenaConfig::default(), 10, 6)
    }
}

/// Maps observations to addresses in a flat value table
///
/// Each state owns a block of `action_count` consecutive slots. Bucket indices are
/// combined in mixed radix with the first axis varying fastest:
/// `address = action_count * Σ bucket_i * Π_{j<i} buckets_j`.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretizer {
    grid: Grid,
    action_count: usize,
    table_size: usize,
}

impl Discretizer {
    pub fn new(grid: Grid, action_count: usize) -> Result<Self> {
        ensure(action_count > 0, || String::from("Action space must not be empty"))?;
        for (dim, axis) in grid.axes.iter().enumerate() {
            axis.validate(dim)?;
        }
        let expected = grid
            .states()
            .and_then(|s| s.checked_mul(action_count))
            .ok_or_else(|| Error::InvalidConfig(String::from("Value table size overflows")))?;

        let mut discretizer = Self {
            grid,
            action_count,
            table_size: 0,
        };
        discretizer.table_size = discretizer.state_index(&[f32::MAX; 6]) + action_count;
        debug_assert_eq!(discretizer.table_size, expected);
        Ok(discretizer)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// Number of slots a value table needs to hold every state-action pair
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Address of the first action slot for the state containing `observation`
    pub fn state_index(&self, observation: &Observation) -> usize {
        let mut index = 0;
        let mut radix = self.action_count;
        for (axis, &value) in self.grid.axes.iter().zip(observation) {
            index += axis.bucket(value) * radix;
            radix *= axis.buckets;
        }
        index
    }

    /// Per-axis buckets of `observation`
    pub fn buckets(&self, observation: &Observation) -> [usize; 6] {
        std::array::from_fn(|i| self.grid.axes[i].bucket(observation[i]))
    }
}
