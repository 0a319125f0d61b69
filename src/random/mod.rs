//! Named, independently seeded random number streams.
//!
//! Every demographic process draws from its own stream (`BirthRng`, `DeathRng`, ...), so
//! adding a draw to one process does not shift the numbers another process sees. All
//! streams derive from one base seed set with `ContextRandomExt::init_random`.
mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::RefCell;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;

use crate::define_data_plugin;
use crate::hashing::HashMap;
use rand::SeedableRng;

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: u64,
    // Behind a RefCell so sampling only needs `&Context`.
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: 0,
        rng_holders: RefCell::new(HashMap::default()),
    }
);
