pub mod lines;
pub mod session;

pub use lines::ThreadedLines;
pub use session::{ChatSession, SessionPhase, SessionSummary, EXIT_HINT};
