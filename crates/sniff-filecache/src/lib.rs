pub mod byte_unit;
pub mod cache;
pub mod clock;
pub mod config;
pub mod diff;
pub mod hash_table;
pub mod path_hash;
pub mod segment;
pub mod sparse_file;

pub use byte_unit::ByteUnit;
pub use cache::{CacheStats, FileCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use diff::PrettyStyle;
pub use path_hash::PathHash;
