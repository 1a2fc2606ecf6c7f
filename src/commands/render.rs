//! Foreground rendering of a long-running job executed on a worker thread.

use crate::core::progress::{Event, Tracker};
use crate::error::{GmError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Runs `job` on a background thread while drawing its progress events.
///
/// The bar is drawn on stderr and stays hidden when stderr is not a terminal. An
/// interrupt ends the process without waiting for the job.
pub fn run_with_progress<R, F>(title: &str, job: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce(Tracker) -> Result<R> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Event>();
    let tracker = Tracker::new(Arc::new(tx));
    let worker = std::thread::spawn(move || job(tracker));

    let bar = new_bar(title);
    // ends once the job dropped the tracker and with it the sender
    for event in rx {
        match event {
            Event::Reset(label) => {
                bar.set_position(0);
                bar.set_message(label);
            }
            Event::Progress(fraction) => bar.set_position(percent(fraction)),
            Event::Info(message) => bar.println(message),
        }
    }
    bar.finish_and_clear();

    worker
        .join()
        .map_err(|_| GmError::Io(std::io::Error::other("background job panicked")))?
}

fn new_bar(title: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::with_template("{prefix:.bold} {msg}\n[{bar:40.cyan/blue}] {percent:>3}%")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.set_prefix(title.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Fraction of work done as a whole percentage, clamped to `0..=100`.
fn percent(fraction: f64) -> u64 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(0.426), 43);
        assert_eq!(percent(1.7), 100);
        assert_eq!(percent(-1.0), 0);
        assert_eq!(percent(f64::NAN), 0);
    }

    #[test]
    fn test_job_result_is_returned() {
        let result = run_with_progress("test", |tracker| {
            tracker.reset("Downloading ...");
            tracker.set_size(4);
            tracker.advance(4);
            tracker.info("done");
            Ok(tracker.written())
        })
        .unwrap();
        assert_eq!(result, 4);
    }

    #[test]
    fn test_job_error_is_returned() {
        let err = run_with_progress("test", |_tracker| -> Result<()> {
            Err(GmError::NotInstalled {
                version: "go1.22.0".to_string(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, GmError::NotInstalled { .. }));
    }
}
