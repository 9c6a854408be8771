use crate::agent::parser::extract_json_array;
use crate::agent::prompt::build_generation_prompt;
use crate::error::{DatagenError, Result};
use crate::llm::{FinishReason, GenerationRequest, LlmClient, DEFAULT_MODEL};
use crate::schema::{SchemaCollection, TableSchema};
use crate::table::Table;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Instrument;

/// generated data per table, in schema order; a failed table holds its error
pub type GeneratedTables = IndexMap<String, Result<Table>>;

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub row_count: usize,
    pub temperature: f32,
    pub model: String,
    pub extra_instructions: String,
    pub max_tokens: u32,
    /// issue the per-table calls concurrently
    pub parallel: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            row_count: 5,
            temperature: 0.5,
            model: DEFAULT_MODEL.to_string(),
            extra_instructions: String::new(),
            max_tokens: 2048,
            parallel: false,
        }
    }
}

/// generate rows for every schema. one entry per schema is always returned and
/// a failure in one table never affects the others.
#[tracing::instrument(skip(llm, schemas, options), fields(tables = schemas.len(), parallel = options.parallel))]
pub async fn generate_tables(
    llm: Arc<dyn LlmClient>,
    schemas: &SchemaCollection,
    options: &GenerationOptions,
) -> GeneratedTables {
    let outcomes = if options.parallel {
        generate_concurrently(llm, schemas, options).await
    } else {
        let mut outcomes = Vec::with_capacity(schemas.len());
        for schema in schemas.values() {
            outcomes.push(generate_table(llm.as_ref(), schema, options).await);
        }
        outcomes
    };

    let generated: GeneratedTables = schemas.keys().cloned().zip(outcomes).collect();

    let failed = generated.values().filter(|r| r.is_err()).count();
    tracing::info!(
        succeeded = generated.len() - failed,
        failed,
        "data generation finished"
    );
    generated
}

async fn generate_concurrently(
    llm: Arc<dyn LlmClient>,
    schemas: &SchemaCollection,
    options: &GenerationOptions,
) -> Vec<Result<Table>> {
    let mut join_set = JoinSet::new();

    for (idx, schema) in schemas.values().enumerate() {
        let llm = Arc::clone(&llm);
        let schema = schema.clone();
        let options = options.clone();
        let span = tracing::info_span!("table_generation", table = %schema.table_name);

        join_set.spawn(
            async move {
                let outcome = generate_table(llm.as_ref(), &schema, &options).await;
                (idx, outcome)
            }
            .instrument(span),
        );
    }

    let mut slots: Vec<Option<Result<Table>>> = schemas.values().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => tracing::error!("table generation task failed: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(schemas.keys())
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| {
                Err(DatagenError::Llm(format!(
                    "generation task for {} did not complete",
                    name
                )))
            })
        })
        .collect()
}

/// one llm call for one table, validated and parsed into rows
#[tracing::instrument(skip(llm, schema, options), fields(table = %schema.table_name, llm.model = %options.model))]
pub async fn generate_table(
    llm: &dyn LlmClient,
    schema: &TableSchema,
    options: &GenerationOptions,
) -> Result<Table> {
    let prompt = build_generation_prompt(schema, options.row_count, &options.extra_instructions);

    let request = GenerationRequest::new(options.model.as_str(), prompt)
        .temperature(options.temperature)
        .max_output_tokens(options.max_tokens)
        .json()
        .permissive();

    let outcome = async {
        let response = llm.generate(request).await.map_err(|e| match e {
            DatagenError::Llm(msg) => DatagenError::Llm(format!(
                "unexpected api failure for {}: {}",
                schema.table_name, msg
            )),
            other => other,
        })?;

        let candidate = response.first().ok_or(DatagenError::NoContent)?;

        match &candidate.finish_reason {
            FinishReason::Normal => {}
            FinishReason::TokenLimitExceeded => {
                return Err(DatagenError::TokenLimit {
                    limit: options.max_tokens,
                })
            }
            FinishReason::ContentFiltered => {
                return Err(DatagenError::ContentFiltered {
                    table: schema.table_name.clone(),
                })
            }
            FinishReason::Other(reason) => {
                return Err(DatagenError::UnexpectedFinish(reason.clone()))
            }
        }

        let records = extract_json_array(&candidate.text)?;
        Table::from_records(records)
    }
    .await;

    match &outcome {
        Ok(table) => tracing::info!(rows = table.len(), "table generated"),
        Err(e) => tracing::warn!("table generation failed: {}", e),
    }
    outcome
}
