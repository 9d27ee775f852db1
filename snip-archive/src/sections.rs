mod dependency_table;
mod export_table;
mod import_table;
mod summary;

pub use dependency_table::*;
pub use export_table::*;
pub use import_table::*;
pub use summary::*;
