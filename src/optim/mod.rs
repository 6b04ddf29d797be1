//! First-order optimizers over flat parameter vectors
mod adam;

pub use adam::{Adam, AdamParams};
