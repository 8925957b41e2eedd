//! Domain models for the email composer

pub mod attachment;
pub mod culture;
pub mod message;

pub use attachment::*;
pub use culture::*;
pub use message::*;
