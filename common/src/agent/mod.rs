pub mod editor;
pub mod generator;
pub mod parser;
pub mod prompt;
pub mod translator;

pub use editor::edit_table;
pub use generator::{generate_table, generate_tables, GeneratedTables, GenerationOptions};
pub use parser::{clean_sql, extract_json_array, is_select};
pub use translator::{SqlTranslator, Translation};
