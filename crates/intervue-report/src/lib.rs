pub mod finalizer;

pub use finalizer::{FinalizeError, Finalizer};
