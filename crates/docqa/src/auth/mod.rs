//! Login sessions

pub mod session;

pub use session::{SessionStore, SessionView};
