//! # Envision Engine
//!
//! Breadth-first closure-and-branch envisioning over qualitative states.

pub mod breadth_first;
pub mod envisioner;
mod exploration;
pub mod expansion;
pub mod parallel;

pub use breadth_first::BreadthFirstEnvisioner;
pub use envisioner::{
    EnvisionConfig, EnvisionStats, Envisioner, Envisionment, Truncation, TruncationReason,
    Verbosity,
};
pub use expansion::{Branching, Budget, Expander, Expansion, Successor};
pub use parallel::ParallelEnvisioner;
