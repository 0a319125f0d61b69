use std::any::TypeId;
use std::cell::RefMut;

use log::trace;
use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::distr::weighted::{Weight, WeightedIndex};
use rand::distr::Distribution;
use rand::{Rng, SeedableRng};

use crate::context::Context;
use crate::hashing::hash_str;
use crate::random::{RngHolder, RngId, RngPlugin};

/// Gets a mutable reference to the stream associated with `R`, creating it from the
/// base seed on first use.
fn get_rng<R: RngId + 'static>(context: &Context) -> RefMut<'_, R::RngType> {
    let data_container = context
        .get_data_container(RngPlugin)
        .expect("You must initialize the random number generator with init_random before sampling");

    let rng_holders = data_container
        .rng_holders
        .try_borrow_mut()
        .expect("A random stream is already borrowed; samplers must not sample recursively");
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                let seed = data_container
                    .base_seed
                    .wrapping_add(hash_str(R::get_name()));
                trace!("creating stream {} (seed={seed})", R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(seed)),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("Random stream has the wrong type")
    })
}

/// Random sampling on `Context`. Every method takes the stream to draw from.
pub trait ContextRandomExt {
    /// Sets the base seed and drops any existing streams so they are reseeded lazily.
    fn init_random(&mut self, base_seed: u64);

    /// Applies `sampler` to the stream for `R`.
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;

    /// Draws one value from `distribution`.
    fn sample_distr<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        distribution: impl Distribution<T>,
    ) -> T
    where
        R::RngType: Rng;

    /// Draws uniformly from `range`.
    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Returns true with probability `p`. `p` is clamped to `[0, 1]`.
    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng;

    /// Picks an index into `weights` with probability proportional to its weight.
    ///
    /// # Panics
    ///
    /// Panics if `weights` is empty, has a negative entry, or sums to zero.
    fn sample_weighted<R: RngId + 'static, T>(&self, rng_id: R, weights: &[T]) -> usize
    where
        R::RngType: Rng,
        T: Clone
            + Default
            + SampleUniform
            + for<'a> std::ops::AddAssign<&'a T>
            + PartialOrd
            + Weight;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {base_seed}");
        let data_container = self.get_data_container_mut(RngPlugin);
        data_container.base_seed = base_seed;
        data_container.rng_holders.borrow_mut().clear();
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }

    fn sample_distr<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        distribution: impl Distribution<T>,
    ) -> T
    where
        R::RngType: Rng,
    {
        let mut rng = get_rng::<R>(self);
        distribution.sample::<R::RngType>(&mut rng)
    }

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        let p = p.clamp(0.0, 1.0);
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    fn sample_weighted<R: RngId + 'static, T>(&self, _rng_id: R, weights: &[T]) -> usize
    where
        R::RngType: Rng,
        T: Clone
            + Default
            + SampleUniform
            + for<'a> std::ops::AddAssign<&'a T>
            + PartialOrd
            + Weight,
    {
        let index = WeightedIndex::new(weights).expect("Invalid weights for sample_weighted");
        let mut rng = get_rng::<R>(self);
        index.sample(&mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::*;
    use crate::define_rng;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn streams_advance() {
        let mut context = Context::new();
        context.init_random(42);
        assert_ne!(
            context.sample(FooRng, RngCore::next_u64),
            context.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    fn named_streams_are_independent() {
        let mut context = Context::new();
        context.init_random(42);
        assert_ne!(
            context.sample(FooRng, RngCore::next_u64),
            context.sample(BarRng, RngCore::next_u64)
        );
    }

    #[test]
    fn reseeding_restarts_streams() {
        let mut context = Context::new();
        context.init_random(42);
        let first = context.sample(FooRng, RngCore::next_u64);
        let second = context.sample(FooRng, RngCore::next_u64);

        context.init_random(42);
        assert_eq!(first, context.sample(FooRng, RngCore::next_u64));
        assert_eq!(second, context.sample(FooRng, RngCore::next_u64));

        context.init_random(88);
        assert_ne!(first, context.sample(FooRng, RngCore::next_u64));
    }

    #[test]
    #[should_panic(expected = "You must initialize the random number generator")]
    fn sampling_requires_init() {
        let context = Context::new();
        context.sample_range(FooRng, 0..10);
    }

    #[test]
    fn sample_range_and_bool() {
        let mut context = Context::new();
        context.init_random(7);
        let value = context.sample_range(FooRng, 0..10);
        assert!((0..10).contains(&value));
        assert!(context.sample_bool(FooRng, 1.0));
        assert!(!context.sample_bool(FooRng, 0.0));
        assert!(context.sample_bool(FooRng, 1.5));
    }

    #[test]
    fn sample_weighted_respects_weights() {
        let mut context = Context::new();
        context.init_random(42);
        let mut zero_count = 0_i32;
        for _ in 0..3000 {
            if context.sample_weighted(FooRng, &[1.0, 2.0]) == 0 {
                zero_count += 1;
            }
        }
        assert!((zero_count - 1000).abs() < 100);
        assert_eq!(context.sample_weighted(FooRng, &[0.0, 0.0, 5.0]), 2);
    }
}
