/// Receives generation progress. Reporting is best effort: implementations must not block.
pub trait ProgressSink {
    /// `fraction` is in `[0, 1]`.
    fn report(&mut self, fraction: f64, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(f64, &str),
{
    fn report(&mut self, fraction: f64, message: &str) {
        self(fraction, message)
    }
}
