//! Drives the simulation through time.
//!
//! Every timestep is two plans at time `timestep`: the `Normal` phase runs the region
//! processors and the `Last` phase reports, snapshots, validates and schedules the next
//! timestep. Burn-in timesteps are plans at negative times.
use std::collections::BTreeMap;
use std::path::Path;

use crate::agents::ContextWorldExt;
use crate::clock::Clock;
use crate::context::{Context, ExecutionPhase};
use crate::define_data_plugin;
use crate::demographics_report::{init_reports, send_run_results, send_time_row, write_snapshots};
use crate::demography::{run_burn_in_timestep, run_region_timestep, RegionCounts};
use crate::error::AbmError;
use crate::ids::RegionId;
use crate::log::{debug, info, warn};
use crate::parameters::{init_parameters, ContextParametersExt};
use crate::population_loader::load_population;
use crate::report::ContextReportExt;
use crate::statistics::ContextStatisticsExt;
use crate::validation::validate_world;

struct LoopState {
    clock: Option<Clock>,
    counts: BTreeMap<RegionId, RegionCounts>,
}

define_data_plugin!(
    LoopPlugin,
    LoopState,
    LoopState {
        clock: None,
        counts: BTreeMap::new(),
    }
);

pub trait ContextClockExt {
    /// # Panics
    ///
    /// Panics if the model has not been scheduled.
    fn clock(&self) -> &Clock;
}

impl ContextClockExt for Context {
    fn clock(&self) -> &Clock {
        self.get_data_container(LoopPlugin)
            .and_then(|state| state.clock.as_ref())
            .expect("Model loop not initialized")
    }
}

#[allow(clippy::cast_precision_loss)]
fn plan_time(timestep: i64) -> f64 {
    timestep as f64
}

/// Schedules the burn-in and the first timestep. Call once, after the population is
/// loaded and before `execute`.
pub fn init_model_loop(context: &mut Context) {
    let model = context.parameters().model.clone();
    let clock = Clock::new(model.start, model.end, model.timestep_months);
    info!(
        "scheduling {} timesteps after {} burn-in timesteps",
        clock.total_timesteps(),
        model.burn_in_timesteps
    );
    context.get_data_container_mut(LoopPlugin).clock = Some(clock);

    let burn_in = i64::from(model.burn_in_timesteps);
    if burn_in > 0 {
        context.set_start_time(plan_time(-burn_in));
        for timestep in -burn_in..0 {
            context.add_plan(plan_time(timestep), move |context| {
                for region in context.world().region_ids() {
                    run_burn_in_timestep(context, region, timestep);
                }
            });
        }
    }
    schedule_timestep(context, 0);
}

/// Everything a run needs before `execute`: parameters from `config`, statistics,
/// report files, the survey population and the schedule.
///
/// # Errors
///
/// Fails on unreadable or invalid parameters, a report file that cannot be created, or
/// a population that does not load.
pub fn setup_model(context: &mut Context, config: &Path) -> Result<(), AbmError> {
    init_parameters(context, config)?;
    let prefix = context.parameters().output.file_prefix.clone();
    context.report_options().file_prefix(prefix);
    context.init_statistics();
    init_reports(context)?;
    load_population(context)?;
    init_model_loop(context);
    Ok(())
}

fn schedule_timestep(context: &mut Context, timestep: i64) {
    context.add_plan_with_phase(plan_time(timestep), run_timestep, ExecutionPhase::Normal);
    context.add_plan_with_phase(plan_time(timestep), finish_timestep, ExecutionPhase::Last);
}

fn run_timestep(context: &mut Context) {
    let clock = context.clock().clone();
    debug!(
        "timestep {} ({}-{:02})",
        clock.timestep(),
        clock.year(),
        clock.month()
    );
    let mut counts = BTreeMap::new();
    for region in context.world().region_ids() {
        match run_region_timestep(context, region, &clock) {
            Ok(region_counts) => {
                counts.insert(region, region_counts);
            }
            Err(error) => {
                context.abort(error);
                return;
            }
        }
    }
    context.get_data_container_mut(LoopPlugin).counts = counts;
}

fn finish_timestep(context: &mut Context) {
    if let Err(error) = try_finish_timestep(context) {
        context.abort(error);
    }
}

fn try_finish_timestep(context: &mut Context) -> Result<(), AbmError> {
    let clock = context.clock().clone();
    let timestep = clock.timestep();
    let output = context.parameters().output.clone();

    let counts = std::mem::take(&mut context.get_data_container_mut(LoopPlugin).counts);
    for (&region, region_counts) in &counts {
        send_run_results(context, &clock, region, region_counts);
    }
    send_time_row(context, &clock);

    if output.validation_interval > 0 && timestep % i64::from(output.validation_interval) == 0 {
        for problem in validate_world(context.world()) {
            warn!("timestep {timestep}: {problem}");
        }
    }

    let mut next = clock.clone();
    next.increment();
    let population = context.world().total_population();
    let finished = !next.in_bounds() || population == 0;
    if let Some(interval) = output.snapshot_interval {
        if interval > 0 && timestep % i64::from(interval) == 0 && !finished {
            write_snapshots(context, &timestep.to_string())?;
        }
    }

    if population == 0 {
        warn!("population is extinct at timestep {timestep}; stopping");
    }
    if finished {
        write_snapshots(context, "END")?;
        info!(
            "finished at {}-{:02} with {population} persons",
            clock.year(),
            clock.month()
        );
        context.shutdown();
        return Ok(());
    }

    let next_timestep = next.timestep();
    context.get_data_container_mut(LoopPlugin).clock = Some(next);
    schedule_timestep(context, next_timestep);
    Ok(())
}
