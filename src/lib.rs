pub mod cli;
pub mod element;
pub mod error;
pub mod merge;
pub mod netlist;
pub mod output;
pub mod parser;
pub mod units;

// Re-export commonly used types
pub use element::{Element, ElementKind};
pub use error::{Result, SpiceError};
pub use merge::{combine_parallel, CombineOptions, MergeStats};
pub use netlist::Netlist;
pub use parser::{CaseMode, DispatchTable, NetlistParser};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
