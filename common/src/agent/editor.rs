use crate::agent::parser::extract_json_array;
use crate::agent::prompt::{build_edit_prompt, EDITOR_SYSTEM_PROMPT};
use crate::error::{DatagenError, Result};
use crate::llm::{GenerationRequest, LlmClient};
use crate::table::Table;

const EDIT_TEMPERATURE: f32 = 0.2;

/// apply a natural-language edit to a table's rows through the llm.
///
/// failures come back as `Err` for the caller to render as the error marker;
/// nothing is raised past this call.
#[tracing::instrument(skip(llm, table, instructions), fields(llm.model = %model, rows = table.len()))]
pub async fn edit_table(
    llm: &dyn LlmClient,
    model: &str,
    table: &Table,
    instructions: &str,
) -> Result<Table> {
    if let Some(message) = table.error() {
        return Err(DatagenError::InvalidTable(format!(
            "cannot edit a failed table: {}",
            message
        )));
    }

    let records = table.to_records_json().map_err(|e| {
        DatagenError::InvalidTable(format!("could not convert table to json: {}", e))
    })?;

    let request = GenerationRequest::new(model, build_edit_prompt(&records, instructions))
        .system(EDITOR_SYSTEM_PROMPT)
        .temperature(EDIT_TEMPERATURE)
        .json();

    let response = llm.generate(request).await?;
    let rows = extract_json_array(response.text()?.trim())?;
    let edited = Table::from_records(rows)?;

    tracing::info!(rows = edited.len(), "table edit applied");
    Ok(edited)
}
