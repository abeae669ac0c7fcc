//! Progress tracking and reporting

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::stream::Sink;

/// Progress bar exposed as a sink
///
/// Meant as the side of a [`crate::tee::TeeWriter`]: every byte the primary
/// accepts is "written" here and advances the bar.
pub struct ProgressSink {
    progress_bar: ProgressBar,
    bytes_copied: u64,
}

impl ProgressSink {
    /// Visible progress bar; `total` of `None` shows a spinner with a byte count
    #[must_use]
    pub fn new(total: Option<u64>) -> Self {
        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                ) {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})")
                {
                    pb.set_style(style);
                }
                pb
            }
        };

        Self {
            progress_bar: pb,
            bytes_copied: 0,
        }
    }

    /// Progress sink that draws nothing, for tests and quiet mode
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
            bytes_copied: 0,
        }
    }

    /// Bytes seen so far
    #[must_use]
    pub const fn bytes_copied(&self) -> u64 {
        self.bytes_copied
    }

    /// Finish the bar, leaving a completion message in place
    pub fn finish(&self) {
        self.progress_bar.finish_with_message("Copy completed");
    }
}

impl Sink for ProgressSink {
    fn write(&mut self, buf: &[u8]) -> (usize, Result<()>) {
        self.bytes_copied += buf.len() as u64;
        self.progress_bar.inc(buf.len() as u64);
        (buf.len(), Ok(()))
    }
}
