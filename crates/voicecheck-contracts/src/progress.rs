/// Emitted once per retry, before the backoff sleep, so an interactive caller
/// can show "retrying n/max" while the executor waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryProgress {
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    pub max_attempts: u32,
    pub message: String,
}

impl RetryProgress {
    pub fn new(attempt: u32, max_attempts: u32) -> Self {
        Self {
            attempt,
            max_attempts,
            message: format!("Model overloaded, retrying {attempt}/{max_attempts}..."),
        }
    }
}
