//! Business logic layer

pub mod composer;

pub use composer::EmailComposer;
