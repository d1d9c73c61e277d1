//! Environment snapshots
//!
//! A snapshot is the text form of every environment reachable from a root,
//! with sharing preserved through small integer indices:
//!
//! ```text
//! (!ENVCOUNT! 2
//! (!SETENV! 0 -1
//! (define counter 3)
//! (!FUNCENV! 1
//! (define next (lambda () (+ n 1)))
//! )
//! )
//! (!SETENV! 1 0
//! (define n 3)
//! )
//! )
//! ```
//!
//! Index 0 is always the root. External functions are never written.

mod deserializer;
mod serializer;

pub use deserializer::{deserialize, deserialize_into};
pub use serializer::{collect_environments, serialize};

pub(crate) const ENVCOUNT: &str = "!ENVCOUNT!";
pub(crate) const SETENV: &str = "!SETENV!";
pub(crate) const FUNCENV: &str = "!FUNCENV!";
