//! Slice-by-slice progress reporting for long voxel loops

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static SLICE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{msg}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} ({{elapsed_precise}})"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Progress display over the outermost axis of a voxel loop
///
/// Hidden unless enabled, so library callers and tests stay silent.
pub struct SliceProgress {
    bar: ProgressBar,
}

impl SliceProgress {
    /// Create a progress display for `slices` outer iterations
    pub fn new(slices: usize, label: &str, enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(slices as u64);
            bar.set_style(SLICE_STYLE.clone());
            bar.set_message(label.to_string());
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Create a display that never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Record that one more slice is complete
    pub fn advance(&self) {
        self.bar.inc(1);
    }

    /// Number of slices completed so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
