//! A console progress bar that follows simulated time.
//!
//! `init_timeline_progress_bar(end)` draws the bar; `Context::execute` then advances it
//! to the time of every plan it runs. Times before zero (the burn-in period) show as no
//! progress. Without an initialized bar the updates do nothing, which is how replicate
//! runs on worker threads stay quiet.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use progress_bar::{
    finalize_progress_bar, init_progress_bar, set_progress_bar_action, set_progress_bar_progress,
    Color, Style,
};

use crate::log::{trace, warn};

// The unrounded end time, so the bar is finalized exactly once.
static MAX_TIME: OnceLock<f64> = OnceLock::new();
static FINISHED: AtomicBool = AtomicBool::new(false);

/// Draws the timeline bar running from 0 to `max_time`.
///
/// Only one bar exists per process; later calls log a warning and keep the first one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn init_timeline_progress_bar(max_time: f64) {
    if MAX_TIME.set(max_time).is_err() {
        warn!("timeline progress bar already initialized; ignoring max time {max_time}");
        return;
    }
    trace!("initializing timeline progress bar with max time {max_time}");
    init_progress_bar(max_time.max(0.0).round() as usize);
    set_progress_bar_action("Month", Color::Blue, Style::Bold);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn update_timeline_progress(current_time: f64) {
    let Some(&max_time) = MAX_TIME.get() else {
        return;
    };
    if FINISHED.load(Ordering::Relaxed) {
        return;
    }
    let progress = current_time.clamp(0.0, max_time.max(0.0));
    set_progress_bar_progress(progress.round() as usize);
    #[allow(clippy::float_cmp)]
    if progress == max_time {
        FINISHED.store(true, Ordering::Relaxed);
        finalize_progress_bar();
    }
}
