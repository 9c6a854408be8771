pub mod ddl;
pub mod table;

pub use ddl::parse_ddl;
pub use table::{ColumnSpec, SchemaCollection, TableSchema};
