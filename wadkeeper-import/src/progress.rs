//! Import progress reporting.

/// Receives progress updates from a copy batch.
pub trait ImportProgress {
    /// Called once before the first file, with the number of archives.
    fn on_start(&self, total: usize);

    /// Called after each archive is processed.
    fn on_file(&self, current: usize, total: usize, name: &str);

    /// Called when the batch is complete.
    fn on_complete(&self, message: &str);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl ImportProgress for SilentProgress {
    fn on_start(&self, _total: usize) {}
    fn on_file(&self, _current: usize, _total: usize, _name: &str) {}
    fn on_complete(&self, _message: &str) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl ImportProgress for LogProgress {
    fn on_start(&self, total: usize) {
        log::info!("Copying {} archive(s)", total);
    }

    fn on_file(&self, current: usize, total: usize, name: &str) {
        if current.is_multiple_of(50) || current == total {
            log::info!("  [{}/{}] {}", current, total, name);
        } else {
            log::debug!("  [{}/{}] {}", current, total, name);
        }
    }

    fn on_complete(&self, message: &str) {
        log::info!("{}", message);
    }
}
