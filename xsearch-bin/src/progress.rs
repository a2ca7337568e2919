use indicatif::ProgressStyle;

/// Terminal progress bar over the days of a search.
pub struct DayProgress(indicatif::ProgressBar);

impl xsearch::ProgressBar for DayProgress {
    fn init(total: usize, description: &str) -> Self {
        let pb = indicatif::ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} days {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_prefix(description.to_owned());
        Self(pb)
    }

    fn increment(&self) {
        self.0.inc(1);
    }

    fn message(&self, msg: &str) {
        self.0.set_message(msg.to_owned());
    }

    fn destroy(self) {
        self.0.finish();
    }
}
