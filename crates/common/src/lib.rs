//! File-system helpers shared by the fragment diversity binaries.

pub mod batches;
pub mod io;
