//! Moving deletion history between machines
//!
//! - `ExportDocument` - Versioned snapshot written by `export_all`
//! - `import_all` - Merge or replace the ledger with a validated document

mod document;
mod reconcile;

pub use document::*;
pub use reconcile::*;
