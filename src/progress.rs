//! Progress bar display for fetches and deploys

use indicatif::{ProgressBar, ProgressStyle};

/// Progress over a sequence of bundles
pub struct ProgressDisplay {
    bundle_pb: ProgressBar,
}

impl ProgressDisplay {
    /// Create a new progress display with total bundle count
    pub fn new(total_bundles: u64) -> Self {
        let bundle_style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        let bundle_pb = ProgressBar::new(total_bundles);
        bundle_pb.set_style(bundle_style);

        Self { bundle_pb }
    }

    /// A display that draws nothing
    pub fn hidden() -> Self {
        Self {
            bundle_pb: ProgressBar::hidden(),
        }
    }

    /// Show the bundle currently being processed
    pub fn update_bundle(&self, bundle: &str, current: usize, total: usize) {
        let msg = format!("({}/{}) {}", current, total, bundle);
        self.bundle_pb.set_message(msg);
    }

    pub fn inc_bundle(&self) {
        self.bundle_pb.inc(1);
    }

    pub fn finish(&self) {
        self.bundle_pb.finish_and_clear();
    }

    /// Abandon on error
    pub fn abandon(&self) {
        self.bundle_pb.abandon();
    }
}
