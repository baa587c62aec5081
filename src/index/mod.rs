pub mod prefix;
pub mod primary;
pub mod secondary;

pub use prefix::{optimize_prefix_size, padded_prefix, truncate_prefix, BinTracker};
pub use primary::{write_ix, IxStats};
pub use secondary::{format_entry, make_ixx, optimize_ix_file, write_ixx, IxxStats, ADDRESS_SIZE};
