use std::path::PathBuf;

use chitwan_abm::model_loop::setup_model;
use chitwan_abm::runner::run_with_custom_args;
use clap::Args;

const DEFAULT_CONFIG: &str = "data/parameters.json";

#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    run_with_custom_args(|context, args, model_args: Option<ModelArgs>| {
        let config = if args.config.is_empty() {
            PathBuf::from(DEFAULT_CONFIG)
        } else {
            PathBuf::from(&args.config)
        };
        setup_model(context, &config)?;

        #[cfg(feature = "progress_bar")]
        if args.replicates <= 1 && !model_args.is_some_and(|m| m.no_progress) {
            use chitwan_abm::model_loop::ContextClockExt;
            #[allow(clippy::cast_precision_loss)]
            let months = context.clock().total_timesteps() as f64;
            chitwan_abm::progress::init_timeline_progress_bar(months);
        }
        #[cfg(not(feature = "progress_bar"))]
        let _ = model_args;
        Ok(())
    })
}
