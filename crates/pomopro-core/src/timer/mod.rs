pub mod driver;
mod engine;
mod mode;

pub use engine::{Authority, Phase, SessionEngine, SessionState, AUTO_START_DELAY, DELEGATION_GRACE};
pub use mode::SessionMode;
