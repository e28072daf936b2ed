pub mod arena;

pub use arena::{Arena, ArenaConfig, Events, Kinematics, Observation};
