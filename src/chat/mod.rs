//! Counselling chat for signed-in users

pub mod models;
pub mod session;


pub use models::{ChatMessage, Sender};
pub use session::ChatSession;
