//! Utility modules shared by the assemblers.

pub mod date;
pub mod slug;
