//! An agent-based model of population and land use in the Chitwan Valley, Nepal.
//!
//! The model follows persons, households and neighborhoods of the Chitwan Valley
//! Family Study through monthly timesteps. Each timestep runs births, deaths,
//! marriages, divorces, individual and household migrations, schooling and (optionally)
//! the founding of non-family organizations, then reports what happened per
//! neighborhood.
//!
//! Everything a run needs lives in a `Context`:
//! * the plan queue that drives time, see `context` and `model_loop`
//! * the `World` arena of agents, see `agents`
//! * named random number streams, one per process, see `random`
//! * parameters and the probability providers built from them, see `parameters` and
//!   `statistics`
//! * CSV report writers, see `report` and `demographics_report`
//!
//! A run is normally started from the `chitwan-abm` binary, which parses the shared
//! command line arguments in `runner` and calls `model_loop::setup_model`.
pub mod agents;
pub mod clock;
pub mod context;
pub mod demographics_report;
pub mod demography;
pub mod error;
pub mod global_properties;
pub mod hashing;
pub mod ids;
pub mod log;
pub mod model_loop;
pub mod parameters;
pub mod plan;
pub mod population_loader;
pub mod prob_dist;
#[cfg(feature = "progress_bar")]
pub mod progress;
pub mod random;
pub mod report;
pub mod runner;
pub mod statistics;
pub mod validation;

#[cfg(test)]
mod test_utils;

// Re-exported for use in macros
pub use csv;
pub use paste;
pub use rand;
