use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Command, FromArgMatches as _};

use crate::context::Context;
use crate::error::AbmError;
use crate::log::{info, set_log_level, LevelFilter};
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;

/// Command line arguments shared by every model binary.
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Path to the JSON parameter file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Directory for report output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Console log level (error, warn, info, debug, trace, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Replace report files that already exist
    #[arg(short, long, default_value_t = false)]
    pub force_overwrite: bool,

    /// Number of independent runs; run `i` uses seed `random_seed + i` and writes to
    /// `output_dir/run_<i>`
    #[arg(long, default_value = "1")]
    pub replicates: u32,
}

impl BaseArgs {
    /// Arguments for a single run with everything else at its default.
    #[must_use]
    pub fn new(config: &str, output_dir: &str) -> BaseArgs {
        BaseArgs {
            random_seed: 0,
            config: config.to_string(),
            output_dir: output_dir.to_string(),
            log_level: None,
            force_overwrite: false,
            replicates: 1,
        }
    }
}

#[derive(Args, Clone)]
pub struct PlaceholderCustom {}

fn create_cli() -> Command {
    let cli = Command::new("chitwan-abm");
    BaseArgs::augment_args(cli)
}

type RunResult = Result<(), Box<dyn std::error::Error>>;

/// Parses the base arguments plus the custom arguments `A`, then runs the model.
///
/// `setup_fn` receives a fresh `Context` (report options and random seed already
/// applied) and must schedule the model; the runner then executes it.
///
/// # Errors
///
/// Returns an error if argument parsing, setup or the run itself fails.
pub fn run_with_custom_args<A, F>(setup_fn: F) -> RunResult
where
    A: Args + Clone + Send + Sync,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), AbmError> + Sync,
{
    let mut cli = create_cli();
    cli = A::augment_args(cli);
    let matches = cli.get_matches();

    let base_args = BaseArgs::from_arg_matches(&matches)?;
    let custom_args = A::from_arg_matches(&matches)?;
    run_with_args_internal(base_args, Some(custom_args), setup_fn)
}

/// Parses the base arguments, then runs the model.
///
/// # Errors
///
/// Returns an error if argument parsing, setup or the run itself fails.
pub fn run_with_args<F>(setup_fn: F) -> RunResult
where
    F: Fn(&mut Context, BaseArgs, Option<PlaceholderCustom>) -> Result<(), AbmError> + Sync,
{
    let matches = create_cli().get_matches();
    let base_args = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(base_args, None, setup_fn)
}

/// Runs `setup_fn` and the resulting simulation once per replicate. Replicates run on
/// scoped threads; each sees the full argument set with its own seed and directory.
///
/// # Errors
///
/// Returns the first error of any replicate.
pub fn run_with_args_internal<A, F>(args: BaseArgs, custom_args: Option<A>, setup_fn: F) -> RunResult
where
    A: Clone + Send + Sync,
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), AbmError> + Sync,
{
    if let Some(level) = &args.log_level {
        let level = LevelFilter::from_str(level)
            .map_err(|_| AbmError::ConfigError(format!("unknown log level: {level}")))?;
        set_log_level(level);
    }

    if args.replicates <= 1 {
        return run_single(args, custom_args, &setup_fn).map_err(Into::into);
    }

    info!("running {} replicates", args.replicates);
    let output_root = PathBuf::from(&args.output_dir);
    let results: Vec<Result<(), AbmError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..args.replicates)
            .map(|i| {
                let mut replicate_args = args.clone();
                replicate_args.random_seed = args.random_seed.wrapping_add(u64::from(i));
                replicate_args.output_dir = output_root
                    .join(format!("run_{i}"))
                    .to_string_lossy()
                    .into_owned();
                let custom_args = custom_args.clone();
                let setup_fn = &setup_fn;
                scope.spawn(move || run_single(replicate_args, custom_args, setup_fn))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(AbmError::AbmError("replicate panicked".to_string())))
            })
            .collect()
    });

    for result in results {
        result?;
    }
    Ok(())
}

fn run_single<A, F>(args: BaseArgs, custom_args: Option<A>, setup_fn: &F) -> Result<(), AbmError>
where
    F: Fn(&mut Context, BaseArgs, Option<A>) -> Result<(), AbmError>,
{
    let mut context = Context::new();

    if !args.output_dir.is_empty() {
        context
            .report_options()
            .directory(PathBuf::from(&args.output_dir));
    }
    context.report_options().overwrite(args.force_overwrite);
    context.init_random(args.random_seed);

    let seed = args.random_seed;
    setup_fn(&mut context, args, custom_args)?;
    context.execute()?;
    info!("run with seed {seed} finished");
    Ok(())
}
