//! Git operations
//!
//! - `CommandRunner` - Capability trait for the git commands restores need
//! - `GitCli` - `CommandRunner` over the git binary, gitoxide for reads
//! - `ReflogScanner` - Deleted-branch discovery from reflog text

mod backend;
mod cli;
mod reflog;
mod runner;

pub use backend::*;
pub use cli::*;
pub use reflog::*;
pub use runner::*;
