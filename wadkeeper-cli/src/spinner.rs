//! Progress display for long-running commands.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A ticking spinner with a message. Hidden when `quiet` is set.
pub(crate) fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .expect("static pattern")
            .tick_chars("/-\\|"),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Bar shown while archives are copied into the library.
#[derive(Clone)]
pub(crate) struct CopyBar {
    pb: ProgressBar,
}

impl CopyBar {
    pub(crate) fn new(quiet: bool) -> Self {
        let pb = ProgressBar::new(0);
        if quiet {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .expect("static pattern")
                .progress_chars("=> ")
                .tick_chars("/-\\|"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub(crate) fn start(&self, total: usize) {
        self.pb.set_length(total as u64);
        self.pb.set_position(0);
    }

    pub(crate) fn file(&self, current: usize, name: &str) {
        self.pb.set_position(current as u64);
        self.pb.set_message(name.to_string());
    }

    /// Hide the bar while `f` talks to the terminal.
    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.pb.suspend(f)
    }

    pub(crate) fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
