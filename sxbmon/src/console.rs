//! UI surface consumed by the upload driver.

/// Text console the upload driver reports into.
///
/// The driver is single-threaded and cooperative: it calls
/// [`Console::is_cancelled`] exactly once between records, so an
/// implementation may use that call as its UI tick and pump pending input
/// events (the Esc key) before answering.
pub trait Console {
    /// Append monitor/status text to the console verbatim.
    fn append_text(&mut self, text: &str);

    /// Whether the user has requested cancellation since the last clear.
    fn is_cancelled(&mut self) -> bool;

    /// Reset the cancellation flag after the driver has observed it.
    fn clear_cancelled(&mut self);

    /// Report the 24-bit address of the first uploaded record.
    fn set_start_address(&mut self, addr: u32);
}
