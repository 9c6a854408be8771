use super::table::{ColumnSpec, SchemaCollection, TableSchema};
use once_cell::sync::Lazy;
use regex::Regex;

static CREATE_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)create(?:\s+or\s+replace)?\s+table\s+[`"]?(\w+)[`"]?\s*\((.*?)\);"#)
        .unwrap()
});

const CONSTRAINT_PREFIXES: [&str; 4] = ["PRIMARY KEY", "FOREIGN KEY", "UNIQUE", "CONSTRAINT"];

/// parse every `create table` statement in `ddl` into a schema collection.
///
/// returns an empty collection when no statement matches; callers report that
/// as "no tables found". a table declared twice keeps its first position and
/// the columns of its last declaration.
#[tracing::instrument(skip(ddl), fields(ddl_len = ddl.len()))]
pub fn parse_ddl(ddl: &str) -> SchemaCollection {
    let mut schemas = SchemaCollection::new();

    for captures in CREATE_TABLE_REGEX.captures_iter(ddl) {
        let table_name = captures[1].to_lowercase();
        let body = captures[2].trim();

        let mut schema = TableSchema::new(table_name.clone());

        for fragment in split_top_level(body) {
            let upper = fragment.to_uppercase();

            if CONSTRAINT_PREFIXES.iter().any(|p| upper.starts_with(p)) {
                schema.constraints.push(fragment.to_string());
                continue;
            }

            match parse_column(fragment) {
                Some(column) => schema.columns.push(column),
                None => tracing::debug!(table = %table_name, fragment, "skipping malformed column"),
            }
        }

        tracing::debug!(
            table = %table_name,
            columns = schema.columns.len(),
            constraints = schema.constraints.len(),
            "parsed table"
        );
        schemas.insert(table_name, schema);
    }

    tracing::info!("parsed {} table(s) from ddl", schemas.len());
    schemas
}

/// split a table body on commas outside parentheses and string literals
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_literal = false;
    let mut start = 0;

    for (idx, ch) in body.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => depth = depth.saturating_sub(1),
            ',' if !in_literal && depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_column(fragment: &str) -> Option<ColumnSpec> {
    let mut tokens = fragment.split_whitespace();
    let name = tokens.next()?;
    let raw_type = tokens.next()?;

    let name = name.trim_matches(|c| c == '`' || c == '"').to_lowercase();
    let raw_type = raw_type.trim_end_matches(',').to_uppercase();

    // VARCHAR(255) -> VARCHAR, DECIMAL(10, -> DECIMAL
    let data_type = raw_type
        .split('(')
        .next()
        .and_then(|t| t.split_whitespace().next())?
        .to_string();

    if name.is_empty() {
        return None;
    }

    Some(ColumnSpec {
        name,
        data_type,
        nullable: !fragment.to_uppercase().contains("NOT NULL"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str, nullable: bool) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
        }
    }

    #[test]
    fn test_parse_users_table() {
        let schemas = parse_ddl("CREATE TABLE users (id INT NOT NULL, name VARCHAR(50));");

        assert_eq!(schemas.len(), 1);
        let users = &schemas["users"];
        assert_eq!(users.table_name, "users");
        assert_eq!(
            users.columns,
            vec![column("id", "INT", false), column("name", "VARCHAR", true)]
        );
        assert!(users.constraints.is_empty());
    }

    #[test]
    fn test_decimal_parameters_do_not_split_columns() {
        let ddl = "CREATE TABLE products (\n  id INT NOT NULL,\n  price DECIMAL(10,2) NOT NULL,\n  name TEXT\n);";
        let schemas = parse_ddl(ddl);
        let products = &schemas["products"];

        assert_eq!(products.columns.len(), 3);
        assert_eq!(products.columns[1], column("price", "DECIMAL", false));
    }

    #[test]
    fn test_spaced_type_parameters() {
        let schemas = parse_ddl("create table t (amount numeric(12, 4), note text);");
        assert_eq!(schemas["t"].columns[0], column("amount", "NUMERIC", true));
        assert_eq!(schemas["t"].columns[1], column("note", "TEXT", true));
    }

    #[test]
    fn test_constraints_are_collected_verbatim() {
        let ddl = r#"
            CREATE TABLE orders (
                id INT NOT NULL,
                customer_id INT,
                PRIMARY KEY (id),
                FOREIGN KEY (customer_id) REFERENCES customers(id),
                UNIQUE (id, customer_id),
                CONSTRAINT chk_id CHECK (id > 0)
            );
        "#;
        let orders = &parse_ddl(ddl)["orders"];

        assert_eq!(orders.columns.len(), 2);
        assert_eq!(
            orders.constraints,
            vec![
                "PRIMARY KEY (id)",
                "FOREIGN KEY (customer_id) REFERENCES customers(id)",
                "UNIQUE (id, customer_id)",
                "CONSTRAINT chk_id CHECK (id > 0)",
            ]
        );
    }

    #[test]
    fn test_quoted_identifiers_and_or_replace() {
        let ddl = "CREATE OR REPLACE TABLE `Customers` (`Email` VARCHAR(255) NOT NULL, \"Age\" int);";
        let schemas = parse_ddl(ddl);

        let customers = &schemas["customers"];
        assert_eq!(customers.columns[0], column("email", "VARCHAR", false));
        assert_eq!(customers.columns[1], column("age", "INT", true));
    }

    #[test]
    fn test_multiple_tables_keep_declaration_order() {
        let ddl = "CREATE TABLE b (x INT);\nCREATE TABLE a (y INT);\nCREATE TABLE c (z INT);";
        let names: Vec<_> = parse_ddl(ddl).keys().cloned().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_table_last_wins() {
        let ddl = "CREATE TABLE t (a INT);\nCREATE TABLE other (x INT);\nCREATE TABLE T (b TEXT, c TEXT);";
        let schemas = parse_ddl(ddl);

        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas.get_index(0).unwrap().0, "t");
        assert_eq!(schemas["t"].column_names(), vec!["b", "c"]);
    }

    #[test]
    fn test_no_tables_found() {
        assert!(parse_ddl("").is_empty());
        assert!(parse_ddl("SELECT * FROM users;").is_empty());
        assert!(parse_ddl("CREATE TABLE broken (id INT").is_empty());
    }

    #[test]
    fn test_malformed_fragments_are_skipped() {
        let schemas = parse_ddl("CREATE TABLE t (id INT, orphan, name TEXT);");
        assert_eq!(schemas["t"].column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_nullability_law() {
        let schemas = parse_ddl(
            "CREATE TABLE t (a INT not null, b INT NULL, c INT NOT NULL DEFAULT 0, d INT);",
        );
        let nullable: Vec<bool> = schemas["t"].columns.iter().map(|c| c.nullable).collect();
        assert_eq!(nullable, vec![false, true, false, true]);
    }

    #[test]
    fn test_default_literal_with_comma() {
        let schemas = parse_ddl("CREATE TABLE t (label TEXT DEFAULT 'a,b', n INT);");
        assert_eq!(schemas["t"].column_names(), vec!["label", "n"]);
    }

    #[test]
    fn test_column_count_and_simplified_types() {
        let ddl = "CREATE TABLE wide (a VARCHAR(10), b DECIMAL(8,2), c CHAR(3) NOT NULL, d DATE, e TIMESTAMP(6));";
        let wide = &parse_ddl(ddl)["wide"];

        assert_eq!(wide.columns.len(), 5);
        for col in &wide.columns {
            assert!(!col.name.is_empty());
            assert!(!col.data_type.contains('('));
        }
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let ddl = "CREATE TABLE a (x INT, PRIMARY KEY (x));\nCREATE TABLE b (y TEXT NOT NULL);";
        assert_eq!(parse_ddl(ddl), parse_ddl(ddl));
    }
}
