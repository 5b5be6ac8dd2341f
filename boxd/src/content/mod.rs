//! §4.B Content store.

pub mod digest;
pub mod store;

pub use digest::Digest;
pub use store::ContentStore;
