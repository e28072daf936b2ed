use log::trace;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Uniform};

use crate::{
    action::Action,
    env::{Environment, Metric, Report},
    error::{ensure, Result},
    ensure_interval,
};

/// Reward for touching the fruit
pub const FRUIT_REWARD: f32 = 2000.0;
/// Reward for touching the floor or the ceiling
pub const DEATH_REWARD: f32 = -5000.0;

/// Player position, player velocity and fruit position, in that order
pub type Observation = [f32; 6];

/// Dimensions and physical constants of the [`Arena`]
///
/// The origin is the centre of the play area and `y` points up.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    pub player_radius: f32,
    pub fruit_radius: f32,
    /// Downward acceleration while up is not held
    pub gravity: f32,
    /// Vertical speed set instantly while up is held
    pub jump_speed: f32,
    /// Horizontal acceleration from left/right, also the drag when neither is held
    pub thrust: f32,
    /// Horizontal speed limit
    pub max_speed_x: f32,
    /// Fraction of horizontal speed kept (and reversed) when hitting a side wall
    pub restitution: f32,
    /// Fruit spawns within `±spawn_fraction` of the arena size around the centre
    pub spawn_fraction: f32,
    /// Seed for fruit placement
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            player_radius: 40.0,
            fruit_radius: 5.0,
            gravity: 2000.0,
            jump_speed: 500.0,
            thrust: 1000.0,
            max_speed_x: 1000.0,
            restitution: 0.8,
            spawn_fraction: 0.25,
            seed: 0,
        }
    }
}

impl ArenaConfig {
    fn validate(&self) -> Result<()> {
        let &Self {
            width,
            height,
            player_radius,
            fruit_radius,
            gravity,
            jump_speed,
            thrust,
            max_speed_x,
            restitution,
            spawn_fraction,
            ..
        } = self;
        let fields = [
            width,
            height,
            player_radius,
            fruit_radius,
            gravity,
            jump_speed,
            thrust,
            max_speed_x,
            restitution,
            spawn_fraction,
        ];
        ensure(fields.iter().all(|x| x.is_finite()), || {
            String::from("Arena dimensions and constants must be finite")
        })?;
        ensure(player_radius > 0.0 && fruit_radius > 0.0, || {
            String::from("Player and fruit radii must be positive")
        })?;
        ensure(width > 2.0 * player_radius && height > 2.0 * player_radius, || {
            format!("Arena {width}x{height} is too small for a player of radius {player_radius}")
        })?;
        ensure(gravity >= 0.0 && jump_speed > 0.0 && thrust > 0.0 && max_speed_x > 0.0, || {
            String::from("Gravity must be non-negative, jump speed, thrust and speed limit positive")
        })?;
        ensure(restitution < 1.0, || format!("Restitution must be below 1, got {restitution}"))?;
        ensure_interval!(restitution, 0.0, 1.0)?;
        ensure_interval!(spawn_fraction, 0.0, 0.5)?;
        ensure(
            width * spawn_fraction > fruit_radius && height * spawn_fraction > fruit_radius,
            || String::from("Fruit spawn region is empty"),
        )
    }

    /// Largest `|x|` the player centre may reach
    pub fn half_width(&self) -> f32 {
        self.width / 2.0 - self.player_radius
    }

    /// Largest `|y|` the player centre may reach before dying
    pub fn half_height(&self) -> f32 {
        self.height / 2.0 - self.player_radius
    }
}

/// Positions and velocities of everything in the arena
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub px: f32,
    pub py: f32,
    pub vx: f32,
    pub vy: f32,
    pub fx: f32,
    pub fy: f32,
}

impl Kinematics {
    pub fn observation(&self) -> Observation {
        [self.px, self.py, self.vx, self.vy, self.fx, self.fy]
    }
}

/// What happened during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Events {
    pub fruit_collected: bool,
    pub died: bool,
}

/// Fixed reward table: fruit +2000, death -5000, nothing otherwise
pub fn reward(events: &Events) -> f32 {
    let fruit = if events.fruit_collected { FRUIT_REWARD } else { 0.0 };
    let death = if events.died { DEATH_REWARD } else { 0.0 };
    fruit + death
}

/// A box with a player circle pushed around by gravity, jumps and horizontal thrust,
/// and a fruit to catch. Touching the floor or the ceiling kills the player, who
/// respawns at the centre.
#[derive(Debug, Clone)]
pub struct Arena {
    config: ArenaConfig,
    k: Kinematics,
    last_vx: f32,
    rng: StdRng,
    spawn_x: Uniform<f32>,
    spawn_y: Uniform<f32>,
    fruits: u64,
    deaths: u64,
    pub report: Report,
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Result<Self> {
        config.validate()?;
        let sx = config.width * config.spawn_fraction - config.fruit_radius;
        let sy = config.height * config.spawn_fraction - config.fruit_radius;
        let mut arena = Self {
            rng: StdRng::seed_from_u64(config.seed),
            spawn_x: Uniform::new(-sx, sx),
            spawn_y: Uniform::new(-sy, sy),
            config,
            k: Kinematics::default(),
            last_vx: 0.0,
            fruits: 0,
            deaths: 0,
            report: Report::new(&[Metric::Reward, Metric::Score, Metric::Deaths]),
        };
        arena.spawn_fruit();
        Ok(arena)
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn kinematics(&self) -> Kinematics {
        self.k
    }

    /// Overwrite the full state, forgetting the previous horizontal velocity
    pub fn set_kinematics(&mut self, k: Kinematics) {
        self.k = k;
        self.last_vx = k.vx;
    }

    /// Fruits collected since construction
    pub fn fruits(&self) -> u64 {
        self.fruits
    }

    /// Deaths since construction
    pub fn deaths(&self) -> u64 {
        self.deaths
    }

    /// Total reward earned since construction, as shown on the HUD
    pub fn total_reward(&self) -> f32 {
        self.fruits as f32 * FRUIT_REWARD + self.deaths as f32 * DEATH_REWARD
    }

    pub fn hud_text(&self) -> String {
        format!("score: {}", self.total_reward())
    }

    fn spawn_fruit(&mut self) {
        self.k.fx = self.spawn_x.sample(&mut self.rng);
        self.k.fy = self.spawn_y.sample(&mut self.rng);
    }

    fn integrate(&mut self, action: Action, dt: f32) {
        let &ArenaConfig {
            gravity,
            jump_speed,
            thrust,
            max_speed_x,
            restitution,
            ..
        } = &self.config;
        let k = &mut self.k;

        if action.up {
            k.vy = jump_speed;
        } else {
            k.vy -= gravity * dt;
        }
        if action.left {
            k.vx -= thrust * dt;
        }
        if action.right {
            k.vx += thrust * dt;
        }
        k.vx = k.vx.clamp(-max_speed_x, max_speed_x);

        // no flicker around zero when the direction reverses
        if self.last_vx != 0.0 && k.vx.signum() != self.last_vx.signum() {
            k.vx = 0.0;
        }

        if !(action.left || action.right) && k.vx != 0.0 {
            let drag = thrust * dt;
            k.vx = if k.vx.abs() <= drag {
                0.0
            } else {
                k.vx - drag.copysign(k.vx)
            };
        }

        k.px += k.vx * dt;
        k.py += k.vy * dt;

        let half_width = self.config.half_width();
        if k.px.abs() > half_width {
            k.px = half_width.copysign(k.px);
            k.vx *= -restitution;
        }
        self.last_vx = k.vx;
    }

    fn touches_fruit(&self) -> bool {
        let Kinematics { px, py, fx, fy, .. } = self.k;
        let (dx, dy) = (px - fx, py - fy);
        let reach = self.config.player_radius + self.config.fruit_radius;
        dx * dx + dy * dy <= reach * reach
    }
}

impl Environment for Arena {
    type State = Observation;
    type Action = Action;
    type Events = Events;

    fn observe(&self) -> Observation {
        self.k.observation()
    }

    fn step(&mut self, action: Action, dt: f32) -> Events {
        let mut events = Events::default();
        self.integrate(action, dt);

        if self.k.py.abs() > self.config.half_height() {
            trace!("player died at ({}, {})", self.k.px, self.k.py);
            let Kinematics { fx, fy, .. } = self.k;
            self.k = Kinematics {
                fx,
                fy,
                ..Default::default()
            };
            self.last_vx = 0.0;
            events.died = true;
            self.deaths += 1;
            *self.report.entry(Metric::Deaths) += 1.0;
        }

        if self.touches_fruit() {
            trace!("fruit collected at ({}, {})", self.k.fx, self.k.fy);
            self.spawn_fruit();
            events.fruit_collected = true;
            self.fruits += 1;
            *self.report.entry(Metric::Score) += 1.0;
        }

        *self.report.entry(Metric::Reward) += reward(&events) as f64;
        events
    }

    fn reward(&self, events: &Events) -> f32 {
        reward(events)
    }

    fn reset(&mut self) -> Observation {
        self.k = Kinematics::default();
        self.last_vx = 0.0;
        self.spawn_fruit();
        self.observe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.05;

    fn arena() -> Arena {
        Arena::new(ArenaConfig::default()).unwrap()
    }

    /// Arena with the fruit parked far away from the player
    fn arena_with(k: Kinematics) -> Arena {
        let mut env = arena();
        env.set_kinematics(Kinematics {
            fx: 300.0,
            fy: 200.0,
            ..k
        });
        env
    }

    #[test]
    fn jump_sets_velocity() {
        let mut env = arena_with(Kinematics::default());
        let events = env.step(Action::new(true, false, false), DT);
        let k = env.kinematics();
        assert_eq!(k.vy, 500.0, "jump velocity is set, not accelerated");
        assert_eq!(k.py, 500.0 * DT, "position uses the updated velocity");
        assert_eq!(events, Events::default());
    }

    #[test]
    fn gravity_accelerates_down() {
        let mut env = arena_with(Kinematics::default());
        env.step(Action::IDLE, DT);
        assert_eq!(env.kinematics().vy, -2000.0 * DT);
    }

    #[test]
    fn thrust_is_capped() {
        let mut env = arena_with(Kinematics {
            vx: 990.0,
            ..Default::default()
        });
        env.step(Action::new(true, false, true), DT);
        assert_eq!(env.kinematics().vx, 1000.0, "speed clamped to the limit");
    }

    #[test]
    fn drag_stops_at_zero() {
        let mut env = arena_with(Kinematics {
            vx: 30.0,
            ..Default::default()
        });
        env.step(Action::new(true, false, false), DT);
        assert_eq!(env.kinematics().vx, 0.0, "drag of 50 does not overshoot 30");

        let mut env = arena_with(Kinematics {
            vx: -120.0,
            ..Default::default()
        });
        env.step(Action::new(true, false, false), DT);
        assert_eq!(env.kinematics().vx, -70.0, "drag reduces magnitude");
    }

    #[test]
    fn reversal_resets_velocity() {
        let mut env = arena_with(Kinematics {
            vx: 20.0,
            ..Default::default()
        });
        env.step(Action::new(true, true, false), DT);
        assert_eq!(env.kinematics().vx, 0.0, "sign flip zeroes velocity");
    }

    #[test]
    fn side_walls_bounce() {
        let mut env = arena_with(Kinematics {
            px: 355.0,
            vx: 200.0,
            ..Default::default()
        });
        env.step(Action::new(true, false, true), DT);
        let k = env.kinematics();
        assert_eq!(k.px, 360.0, "clamped to the wall");
        assert_eq!(k.vx, -0.8 * 250.0, "velocity reversed and damped");

        // the bounce itself is not treated as a flicker on the next step
        env.step(Action::new(true, false, false), DT);
        assert!(env.kinematics().vx < 0.0, "still moving away from the wall");
    }

    #[test]
    fn floor_kills() {
        let mut env = arena_with(Kinematics {
            px: 100.0,
            py: -255.0,
            vx: 40.0,
            vy: -200.0,
            ..Default::default()
        });
        let events = env.step(Action::IDLE, DT);
        assert!(events.died, "death reported");
        let k = env.kinematics();
        assert_eq!((k.px, k.py, k.vx, k.vy), (0.0, 0.0, 0.0, 0.0), "player reset");
        assert_eq!((k.fx, k.fy), (300.0, 200.0), "fruit untouched");
        assert_eq!(env.reward(&events), DEATH_REWARD);
        assert_eq!(env.deaths(), 1);
    }

    #[test]
    fn ceiling_kills() {
        let mut env = arena_with(Kinematics {
            py: 255.0,
            ..Default::default()
        });
        assert!(env.step(Action::new(true, false, false), DT).died);
    }

    #[test]
    fn collision_boundary_is_inclusive() {
        let mut env = arena();
        env.set_kinematics(Kinematics {
            fx: 45.0,
            ..Default::default()
        });
        // one jump step moves the player up, so park the fruit where the player lands
        let mut env2 = arena();
        env2.set_kinematics(Kinematics {
            fx: 0.0,
            fy: 25.0 + 45.0,
            ..Default::default()
        });
        let events = env2.step(Action::new(true, false, false), DT);
        assert!(events.fruit_collected, "distance exactly PR+FR collides");
        assert_eq!(env2.reward(&events), FRUIT_REWARD);
        assert_eq!(env2.fruits(), 1);

        let events = env.step(Action::new(true, false, false), DT);
        assert!(!events.fruit_collected, "just outside reach");
    }

    #[test]
    fn fruit_respawns_inside_region() {
        let mut env = arena();
        for _ in 0..500 {
            env.set_kinematics(Kinematics {
                fy: 25.0,
                ..Default::default()
            });
            assert!(env.step(Action::new(true, false, false), DT).fruit_collected);
            let Kinematics { fx, fy, .. } = env.kinematics();
            assert!(fx > -200.0 && fx < 200.0, "fx {fx} inside central region");
            assert!(fy > -150.0 && fy < 150.0, "fy {fy} inside central region");
        }
    }

    #[test]
    fn report_tracks_events() {
        let mut env = arena_with(Kinematics {
            py: -258.0,
            ..Default::default()
        });
        env.step(Action::IDLE, DT);
        assert_eq!(env.report[Metric::Deaths], 1.0);
        assert_eq!(env.report[Metric::Reward], DEATH_REWARD as f64);
        assert_eq!(env.hud_text(), "score: -5000");
    }

    #[test]
    fn invalid_configs() {
        let small = ArenaConfig {
            width: 60.0,
            ..Default::default()
        };
        assert!(Arena::new(small).is_err());
        let bouncy = ArenaConfig {
            restitution: 1.0,
            ..Default::default()
        };
        assert!(Arena::new(bouncy).is_err());
        for unbounded in [
            ArenaConfig {
                width: f32::INFINITY,
                ..Default::default()
            },
            ArenaConfig {
                height: f32::NAN,
                ..Default::default()
            },
            ArenaConfig {
                gravity: f32::INFINITY,
                ..Default::default()
            },
        ] {
            assert!(
                matches!(Arena::new(unbounded), Err(crate::Error::InvalidConfig(_))),
                "non-finite config rejected"
            );
        }
    }

    #[test]
    fn reset_recentres_player() {
        let mut env = arena();
        env.set_kinematics(Kinematics {
            px: 120.0,
            py: 80.0,
            vx: 300.0,
            vy: -200.0,
            ..env.kinematics()
        });
        let fruits = env.fruits();
        let obs = env.reset();
        assert_eq!(obs[..4], [0.0; 4], "player at rest in the centre");
        let cfg = env.config().clone();
        let (sx, sy) = (
            cfg.width * cfg.spawn_fraction - cfg.fruit_radius,
            cfg.height * cfg.spawn_fraction - cfg.fruit_radius,
        );
        assert!(obs[4].abs() < sx && obs[5].abs() < sy, "fruit respawned in region");
        assert_eq!(env.fruits(), fruits, "counters survive a reset");
        // no leftover reversal state: pushing right keeps moving right
        env.step(Action::new(false, false, true), DT);
        assert!(env.kinematics().vx > 0.0);
    }
}
