// State management module
// Holds the per-UI-session pointer to the selected conversation

pub mod session;

pub use session::SessionPointer;
