mod browser;
mod step;

pub use browser::FlowDriver;
pub use step::FlowStep;

/// Request header the test identity provider reads to pick which user the
/// auto sign-in shortcut logs in.
pub const USER_HINT_HEADER: &str = "X-Identity-Test-User-Hint";
