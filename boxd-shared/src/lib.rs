//! Shared primitives used across the `boxd` workspace: the closed error
//! kind set, the sandbox-transport descriptor, id helpers, and a few string
//! constants. Kept deliberately small — anything with real behavior lives
//! in `boxd` itself.

pub mod constants;
pub mod errors;
pub mod ids;
pub mod transport;

pub use errors::{CoreError, CoreResult};
pub use transport::Transport;
