/// Per-day progress reporting for a search session.
pub trait ProgressBar {
    fn init(total: usize, description: &str) -> Self;
    fn increment(&self);
    /// Replace the status line, e.g. with the current day's result.
    fn message(&self, msg: &str);
    fn destroy(self);
}

/// Reports nothing.
impl ProgressBar for () {
    fn init(_total: usize, _description: &str) -> Self {}
    fn increment(&self) {}
    fn message(&self, _msg: &str) {}
    fn destroy(self) {}
}
