#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod sort;
pub mod stats;
pub mod text;

pub use config::IndexConfig;
pub use error::{Error, Result};
pub use index::{make_ixx, optimize_ix_file, optimize_prefix_size};
pub use pipeline::{ix_ixx, ix_ixx_stream, make_ix, IndexBuilder, IxBuild};
pub use stats::BuildReport;
