use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// parsed tables keyed by lowercased name, in order of appearance in the ddl
pub type SchemaCollection = IndexMap<String, TableSchema>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnSpec {
    /// prompt descriptor, e.g. `price (DECIMAL, Nullable: false)`
    pub fn descriptor(&self) -> String {
        format!(
            "{} ({}, Nullable: {})",
            self.name, self.data_type, self.nullable
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    pub constraints: Vec<String>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_format() {
        let column = ColumnSpec {
            name: "price".to_string(),
            data_type: "DECIMAL".to_string(),
            nullable: false,
        };
        assert_eq!(column.descriptor(), "price (DECIMAL, Nullable: false)");
    }

    #[test]
    fn test_schema_serializes_type_field() {
        let mut schema = TableSchema::new("users");
        schema.columns.push(ColumnSpec {
            name: "id".to_string(),
            data_type: "INT".to_string(),
            nullable: false,
        });

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["columns"][0]["type"], "INT");
        assert_eq!(value["table_name"], "users");
    }
}
