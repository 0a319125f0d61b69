//! The `Context` owns everything a single simulation run needs: the plan queue that
//! drives time forward and the type-keyed data plugins that hold
//! model state (the population arena, RNG streams, parameters, report writers).
//!
//! Nothing in the model reaches for global state; every processor takes `&Context` or
//! `&mut Context`, so independent replicates can run side by side on separate threads.
use std::any::{Any, TypeId};

use crate::error::AbmError;
use crate::hashing::HashMap;
use crate::log::{debug, trace};
use crate::plan::PlanQueue;
#[cfg(feature = "progress_bar")]
use crate::progress::update_timeline_progress;

/// A trait for objects that can provide data containers to be held by `Context`.
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a unit struct that keys a data container stored in `Context`.
///
/// The container is created lazily with `$default` the first time it is borrowed
/// mutably.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default:expr) => {
        #[derive(Copy, Clone)]
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Plans scheduled for the same time run in phase order.
///
/// The model loop runs the demographic processors in `Normal` and captures statistics
/// in `Last`, so a timestep's output always reflects every event of that timestep.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionPhase {
    Normal,
    Last,
}

type Callback = dyn FnOnce(&mut Context);

pub struct Context {
    plan_queue: PlanQueue<Box<Callback>, ExecutionPhase>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
    fatal_error: Option<AbmError>,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: PlanQueue::new(),
            data_plugins: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
            fatal_error: None,
        }
    }

    /// Moves the clock back (or forward) before anything is scheduled. The burn-in
    /// period uses this to run at negative timesteps.
    ///
    /// # Panics
    ///
    /// Panics if `start_time` is not finite or if plans were already added.
    pub fn set_start_time(&mut self, start_time: f64) {
        assert!(start_time.is_finite(), "Start time must be finite");
        assert!(
            self.plan_queue.is_empty(),
            "Start time must be set before any plans are added"
        );
        self.current_time = start_time;
    }

    /// Add a plan to the queue at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is in the past, infinite, or NaN.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal);
    }

    /// Add a plan to the queue at `time` in the given phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is in the past, infinite, or NaN.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Time is invalid"
        );
        self.plan_queue.add_plan(time, Box::new(callback), phase);
    }

    /// Returns the container for `plugin`, creating it on first access.
    ///
    /// # Panics
    ///
    /// Panics if the stored container has an unexpected type, which cannot happen for
    /// containers registered through `define_data_plugin!`.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .expect("Data container has the wrong type")
    }

    /// Returns the container for `plugin`, or `None` if it was never created.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stops the run once the current plan returns. Pending plans are dropped.
    pub fn shutdown(&mut self) {
        debug!("shutdown requested at t={}", self.current_time);
        self.shutdown_requested = true;
    }

    /// Records an error that makes continuing impossible and shuts the run down.
    /// `execute` returns the first error recorded.
    pub fn abort(&mut self, error: AbmError) {
        if self.fatal_error.is_none() {
            self.fatal_error = Some(error);
        }
        self.shutdown();
    }

    /// Runs plans until the queue is empty or a shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns the error passed to `abort`, if any.
    pub fn execute(&mut self) -> Result<(), AbmError> {
        trace!("entering event loop");
        loop {
            if self.shutdown_requested {
                self.plan_queue.clear();
                break;
            }

            match self.plan_queue.get_next_plan() {
                Some(plan) => {
                    self.current_time = plan.time;
                    #[cfg(feature = "progress_bar")]
                    update_timeline_progress(self.current_time);
                    (plan.data)(self);
                }
                None => break,
            }
        }

        match self.fatal_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    define_data_plugin!(ComponentA, Vec<u32>, vec![]);

    fn add_plan(context: &mut Context, time: f64, value: u32) {
        context.add_plan(time, move |context| {
            context.get_data_container_mut(ComponentA).push(value);
        });
    }

    fn recorded(context: &Context) -> Vec<u32> {
        context
            .get_data_container(ComponentA)
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    #[should_panic(expected = "Time is invalid")]
    fn plan_in_the_past() {
        let mut context = Context::new();
        add_plan(&mut context, -1.0, 0);
    }

    #[test]
    #[should_panic(expected = "Time is invalid")]
    fn nan_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, f64::NAN, 0);
    }

    #[test]
    fn empty_context() {
        let mut context = Context::new();
        context.execute().unwrap();
        assert_eq!(context.get_current_time(), 0.0);
        assert!(context.get_data_container(ComponentA).is_none());
    }

    #[test]
    fn negative_start_time_allows_burn_in_plans() {
        let mut context = Context::new();
        context.set_start_time(-3.0);
        add_plan(&mut context, -3.0, 1);
        add_plan(&mut context, 0.0, 2);
        context.execute().unwrap();
        assert_eq!(recorded(&context), vec![1, 2]);
    }

    #[test]
    #[should_panic(expected = "Start time must be set before any plans are added")]
    fn start_time_after_plans_panics() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.set_start_time(-1.0);
    }

    #[test]
    fn phases_order_plans_at_the_same_time() {
        let mut context = Context::new();
        context.add_plan_with_phase(
            1.0,
            |context| context.get_data_container_mut(ComponentA).push(3),
            ExecutionPhase::Last,
        );
        add_plan(&mut context, 1.0, 1);
        add_plan(&mut context, 1.0, 2);
        context.execute().unwrap();
        assert_eq!(recorded(&context), vec![1, 2, 3]);
    }

    #[test]
    fn shutdown_drops_pending_plans() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.add_plan(2.0, Context::shutdown);
        add_plan(&mut context, 3.0, 3);
        context.execute().unwrap();
        assert_eq!(context.get_current_time(), 2.0);
        assert_eq!(recorded(&context), vec![1]);
    }

    #[test]
    fn abort_returns_first_error() {
        let mut context = Context::new();
        context.add_plan(1.0, |context| {
            context.abort(AbmError::NoLandAvailable(4));
            context.abort(AbmError::NoLandAvailable(5));
        });
        add_plan(&mut context, 2.0, 2);
        let result = context.execute();
        assert!(matches!(result, Err(AbmError::NoLandAvailable(4))));
        assert!(recorded(&context).is_empty());
    }
}
