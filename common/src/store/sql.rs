use crate::table::Table;
use serde_json::Value;

/// postgres column type inferred from generated json values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }
}

/// a cell converted for binding against its column type
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Boolean(Option<bool>),
    Text(Option<String>),
}

/// narrowest type that holds every non-null value; all-null columns are text
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
    let mut inferred: Option<ColumnType> = None;

    for value in values {
        let ty = match value {
            Value::Null => continue,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Number(n) if n.is_i64() => ColumnType::BigInt,
            Value::Number(_) => ColumnType::Double,
            _ => ColumnType::Text,
        };

        inferred = Some(match (inferred, ty) {
            (None, ty) => ty,
            (Some(a), b) if a == b => a,
            (Some(ColumnType::BigInt), ColumnType::Double)
            | (Some(ColumnType::Double), ColumnType::BigInt) => ColumnType::Double,
            _ => ColumnType::Text,
        });

        if inferred == Some(ColumnType::Text) {
            break;
        }
    }

    inferred.unwrap_or(ColumnType::Text)
}

/// column names with their inferred types, in table column order
pub fn column_types(table: &Table) -> Vec<(String, ColumnType)> {
    table
        .columns()
        .iter()
        .map(|column| {
            let ty = infer_column_type(table.rows().iter().filter_map(|row| row.get(column)));
            (column.clone(), ty)
        })
        .collect()
}

pub fn cell_value(value: Option<&Value>, ty: ColumnType) -> CellValue {
    let value = value.filter(|v| !v.is_null());
    match ty {
        ColumnType::BigInt => CellValue::BigInt(value.and_then(Value::as_i64)),
        ColumnType::Double => CellValue::Double(value.and_then(Value::as_f64)),
        ColumnType::Boolean => CellValue::Boolean(value.and_then(Value::as_bool)),
        ColumnType::Text => CellValue::Text(value.map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
    }
}

pub fn quote_ident(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn create_table_sql(table: &str, columns: &[(String, ColumnType)]) -> String {
    let definitions = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql_name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), definitions)
}

pub fn insert_sql(table: &str, columns: &[(String, ColumnType)]) -> String {
    let names = columns
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names,
        placeholders
    )
}

/// wrap a select so each row comes back as one json object, keys in select
/// order. `columns` renames the result columns by position, which keeps
/// columns that share a name apart.
pub fn row_json_query(sql: &str, columns: &[String]) -> String {
    let sql = sql.trim().trim_end_matches(';').trim_end();
    if columns.is_empty() {
        return format!("SELECT row_to_json(q)::text FROM ({}) AS q", sql);
    }
    let aliases = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT row_to_json(q)::text FROM ({}) AS q({})", sql, aliases)
}

/// make result column names unique: a repeated `id` becomes `id_1`, `id_2`, ...
pub fn unique_column_names(names: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while unique.contains(&candidate) || (candidate != *name && names.contains(&candidate)) {
            candidate = format!("{}_{}", name, suffix);
            suffix += 1;
        }
        unique.push(candidate);
    }
    unique
}

/// identifier as it must be written in a query: plain lowercase names as-is,
/// anything postgres would fold or reject quoted
pub fn display_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        quote_ident(name)
    }
}

/// render introspected `(table, column, data_type)` rows as ddl-like text,
/// tables in the order of `tables`; tables with no columns are left out
pub fn render_schema_ddl(tables: &[String], columns: &[(String, String, String)]) -> String {
    tables
        .iter()
        .filter_map(|table| {
            let definitions: Vec<String> = columns
                .iter()
                .filter(|(t, _, _)| t == table)
                .map(|(_, column, data_type)| format!("    {} {}", display_ident(column), data_type))
                .collect();

            if definitions.is_empty() {
                None
            } else {
                Some(format!(
                    "CREATE TABLE {} (\n{}\n);",
                    display_ident(table),
                    definitions.join(",\n")
                ))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_column_type() {
        let ints = [json!(1), json!(null), json!(3)];
        assert_eq!(infer_column_type(&ints), ColumnType::BigInt);

        let mixed_numbers = [json!(1), json!(2.5)];
        assert_eq!(infer_column_type(&mixed_numbers), ColumnType::Double);

        let bools = [json!(true), json!(false)];
        assert_eq!(infer_column_type(&bools), ColumnType::Boolean);

        let mixed = [json!(1), json!("two")];
        assert_eq!(infer_column_type(&mixed), ColumnType::Text);

        let nulls = [json!(null)];
        assert_eq!(infer_column_type(&nulls), ColumnType::Text);
    }

    #[test]
    fn test_column_types_follow_table() {
        let table = Table::from_records(vec![
            json!({"id": 1, "price": 9.99, "active": true, "name": "a"}),
            json!({"id": 2, "price": 10, "active": null, "name": null}),
        ])
        .unwrap();

        assert_eq!(
            column_types(&table),
            vec![
                ("id".to_string(), ColumnType::BigInt),
                ("price".to_string(), ColumnType::Double),
                ("active".to_string(), ColumnType::Boolean),
                ("name".to_string(), ColumnType::Text),
            ]
        );
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value(Some(&json!(10)), ColumnType::Double), CellValue::Double(Some(10.0)));
        assert_eq!(cell_value(None, ColumnType::BigInt), CellValue::BigInt(None));
        assert_eq!(cell_value(Some(&json!(null)), ColumnType::Text), CellValue::Text(None));
        assert_eq!(
            cell_value(Some(&json!({"a": 1})), ColumnType::Text),
            CellValue::Text(Some("{\"a\":1}".to_string()))
        );
        assert_eq!(
            cell_value(Some(&json!(7)), ColumnType::Text),
            CellValue::Text(Some("7".to_string()))
        );
    }

    #[test]
    fn test_statements() {
        let columns = vec![
            ("id".to_string(), ColumnType::BigInt),
            ("full \"name\"".to_string(), ColumnType::Text),
        ];

        assert_eq!(drop_table_sql("users"), "DROP TABLE IF EXISTS \"users\"");
        assert_eq!(
            create_table_sql("users", &columns),
            "CREATE TABLE \"users\" (\"id\" BIGINT, \"full \"\"name\"\"\" TEXT)"
        );
        assert_eq!(
            insert_sql("users", &columns),
            "INSERT INTO \"users\" (\"id\", \"full \"\"name\"\"\") VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_row_json_query_strips_terminator() {
        assert_eq!(
            row_json_query("SELECT name FROM products ORDER BY price DESC LIMIT 1; ", &[]),
            "SELECT row_to_json(q)::text FROM (SELECT name FROM products ORDER BY price DESC LIMIT 1) AS q"
        );
    }

    #[test]
    fn test_join_columns_with_shared_names_stay_apart() {
        let described: Vec<String> = ["id", "id", "name", "name"].iter().map(|s| s.to_string()).collect();
        let columns = unique_column_names(&described);
        assert_eq!(columns, vec!["id", "id_1", "name", "name_1"]);

        assert_eq!(
            row_json_query("SELECT p.id, c.id, p.name, c.name FROM p JOIN c ON true;", &columns),
            "SELECT row_to_json(q)::text FROM (SELECT p.id, c.id, p.name, c.name FROM p JOIN c ON true) \
             AS q(\"id\", \"id_1\", \"name\", \"name_1\")"
        );

        // what postgres returns for one aliased row
        let row: serde_json::Value =
            serde_json::from_str(r#"{"id": 1, "id_1": 7, "name": "bolt", "name_1": "ada"}"#).unwrap();
        let table = Table::from_records(vec![row]).unwrap();
        assert_eq!(table.columns(), &["id", "id_1", "name", "name_1"]);
        assert_eq!(table.rows()[0]["id"], json!(1));
        assert_eq!(table.rows()[0]["id_1"], json!(7));
    }

    #[test]
    fn test_unique_column_names_avoid_existing_suffixes() {
        let described: Vec<String> = ["id", "id_1", "id"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_column_names(&described), vec!["id", "id_1", "id_2"]);
    }

    #[test]
    fn test_display_ident() {
        assert_eq!(display_ident("first_name"), "first_name");
        assert_eq!(display_ident("_x2"), "_x2");
        assert_eq!(display_ident("firstName"), "\"firstName\"");
        assert_eq!(display_ident("order date"), "\"order date\"");
        assert_eq!(display_ident("2nd"), "\"2nd\"");
    }

    #[test]
    fn test_render_schema_ddl() {
        let tables = vec!["products".to_string(), "missing".to_string(), "customers".to_string()];
        let columns = vec![
            ("customers".to_string(), "email".to_string(), "text".to_string()),
            ("products".to_string(), "id".to_string(), "bigint".to_string()),
            ("products".to_string(), "price".to_string(), "double precision".to_string()),
        ];

        assert_eq!(
            render_schema_ddl(&tables, &columns),
            "CREATE TABLE products (\n    id bigint,\n    price double precision\n);\n\n\
             CREATE TABLE customers (\n    email text\n);"
        );
    }

    #[test]
    fn test_render_schema_ddl_quotes_case_sensitive_names() {
        let tables = vec!["Customers".to_string()];
        let columns = vec![
            ("Customers".to_string(), "id".to_string(), "bigint".to_string()),
            ("Customers".to_string(), "firstName".to_string(), "text".to_string()),
        ];

        assert_eq!(
            render_schema_ddl(&tables, &columns),
            "CREATE TABLE \"Customers\" (\n    id bigint,\n    \"firstName\" text\n);"
        );
    }
}
