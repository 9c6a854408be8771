use crate::schema::TableSchema;

pub const SQL_RULES: &str = "STRICT rules:\n\
     1. the only output must be the sql query. do not include explanations, code blocks, or comments.\n\
     2. the sql query must be executable against the provided schema.\n\
     3. use SELECT statements for all questions.\n\
     4. use the exact table and column names from the ddl schema.";

pub const EDITOR_SYSTEM_PROMPT: &str =
    "your only task is to act as a json data editor. you will receive a json array of data and an instruction. \
     apply the instruction to the json and return ONLY the modified json array. \
     do not add explanations, comments, or additional text. the output must be valid json.";

/// prompt asking for `row_count` rows of one table as a bare json array
pub fn build_generation_prompt(
    schema: &TableSchema,
    row_count: usize,
    extra_instructions: &str,
) -> String {
    let columns = schema
        .columns
        .iter()
        .map(|c| c.descriptor())
        .collect::<Vec<_>>()
        .join("; ");

    let constraints = if schema.constraints.is_empty() {
        "none".to_string()
    } else {
        schema.constraints.join("; ")
    };

    let extra = extra_instructions.trim();
    let extra = if extra.is_empty() { "none" } else { extra };

    format!(
        "Generate {} rows of realistic data for the table \"{}\".\n\
         Schema:\n\
         Columns: {}.\n\
         Constraints: {}.\n\n\
         Additional instructions: {}\n\n\
         IMPORTANT: return the data ONLY as a valid JSON array of objects, where keys match column names.",
        row_count, schema.table_name, columns, constraints, extra
    )
}

/// system instruction grounding sql translation in `schema_ddl`
pub fn build_sql_system_prompt(schema_ddl: &str) -> String {
    format!(
        "you are an expert natural language to sql translator. your only task is to translate the user's \
         question into a valid sql query based strictly on the following ddl schema:\n\n{}\n\n{}",
        schema_ddl.trim(),
        SQL_RULES
    )
}

pub fn build_sql_user_prompt(question: &str) -> String {
    format!("User question: {}", question.trim())
}

pub fn build_edit_prompt(records_json: &str, instructions: &str) -> String {
    format!(
        "JSON data to modify:\n{}\n\nUser instruction:\n\"{}\"\n\nModified JSON:",
        records_json,
        instructions.trim()
    )
}
