use anyhow::{anyhow, bail, Result};
use common::agent::{edit_table, generate_tables, GenerationOptions, SqlTranslator, Translation};
use common::config::Config;
use common::llm::{GeminiClient, LlmClient};
use common::schema::parse_ddl;
use common::session::{MessageContent, Role, Session};
use common::store::{LoadResults, PgStore, TableStore};
use common::table::{export_zip, from_csv, Table};
use common::tracing::{select_trace_sink, TraceSink};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;

/// collaborators shared by the one-shot commands and the shell; each one is
/// built on first use so commands that don't need it never require its config
pub struct App {
    config: Config,
    otlp_active: bool,
    llm: OnceCell<Arc<dyn LlmClient>>,
    store: OnceCell<Arc<dyn TableStore>>,
    tracer: OnceCell<Option<Arc<dyn TraceSink>>>,
}

impl App {
    pub fn new(config: Config, otlp_active: bool) -> Self {
        Self {
            config,
            otlp_active,
            llm: OnceCell::new(),
            store: OnceCell::new(),
            tracer: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.llm.model
    }

    fn llm(&self) -> Result<Arc<dyn LlmClient>> {
        let llm = self.llm.get_or_try_init(|| -> Result<Arc<dyn LlmClient>> {
            let api_key = self.config.llm.require_api_key()?;
            Ok(Arc::new(GeminiClient::with_timeout(
                api_key,
                self.config.llm.timeout,
            )?))
        })?;
        Ok(Arc::clone(llm))
    }

    fn store(&self) -> Result<Arc<dyn TableStore>> {
        let store = self.store.get_or_try_init(|| -> Result<Arc<dyn TableStore>> {
            Ok(Arc::new(PgStore::new(&self.config.database)?))
        })?;
        Ok(Arc::clone(store))
    }

    fn tracer(&self) -> Result<Option<Arc<dyn TraceSink>>> {
        let tracer = self
            .tracer
            .get_or_try_init(|| select_trace_sink(&self.config, self.otlp_active))?;
        Ok(tracer.clone())
    }

    /// parse the ddl, generate every table and replace the session dataset
    #[tracing::instrument(skip_all, fields(rows = options.row_count, load = load))]
    pub async fn generate(
        &self,
        session: &mut Session,
        ddl: &str,
        options: &GenerationOptions,
        load: bool,
    ) -> Result<()> {
        let schemas = parse_ddl(ddl);
        if schemas.is_empty() {
            bail!("no tables found: the ddl has no CREATE TABLE statements");
        }
        tracing::info!(tables = schemas.len(), "ddl parsed");

        let generated = generate_tables(self.llm()?, &schemas, options).await;
        session.replace_tables(generated);

        for (name, table) in session.tables() {
            print_table(name, table);
        }

        if load {
            self.load(session.tables()).await;
        }
        Ok(())
    }

    /// translate a question to sql and run it against the loaded tables
    #[tracing::instrument(skip(self, session))]
    pub async fn ask(&self, session: &mut Session, question: &str, temperature: f32) -> Result<()> {
        if !session.has_tables() {
            bail!("no data to query: generate tables first");
        }

        let store = self.store()?;
        let schema_ddl = match store.describe_tables(&session.table_names()).await {
            Ok(ddl) => ddl,
            Err(e) => {
                println!("Error: {}", e);
                return Ok(());
            }
        };

        let translator = SqlTranslator::new(self.llm()?, self.tracer()?, self.model());
        let translation = translator.translate(question, &schema_ddl, temperature).await?;

        session.push_message(Role::User, MessageContent::Text(question.to_string()));

        let sql = match &translation {
            Translation::Sql(sql) => sql,
            Translation::Error(_) => {
                println!("{}", translation);
                session.push_message(Role::Assistant, MessageContent::Text(translation.to_string()));
                return Ok(());
            }
        };

        println!("{}\n", sql);
        match store.run_query(sql).await {
            Ok(table) => {
                println!("{}", table.render());
                session.push_message(Role::Assistant, MessageContent::Table(table));
            }
            Err(e) => {
                println!("Error: {}", e);
                session.push_message(Role::Assistant, MessageContent::Text(e.to_string()));
            }
        }
        Ok(())
    }

    /// apply an edit to the selected (or named) table and reload it
    #[tracing::instrument(skip(self, session))]
    pub async fn edit(
        &self,
        session: &mut Session,
        instructions: &str,
        table: Option<&str>,
        load: bool,
    ) -> Result<()> {
        if let Some(name) = table {
            session.select(name)?;
        }
        let (name, current) = session
            .selected_table()
            .map(|(name, table)| (name.to_string(), table.clone()))
            .ok_or_else(|| anyhow!("no table selected: generate tables first"))?;

        match edit_table(self.llm()?.as_ref(), self.model(), &current, instructions).await {
            Ok(edited) => {
                session.update_table(&name, edited.clone())?;
                print_table(&name, &edited);

                if load {
                    let mut single = IndexMap::new();
                    single.insert(name, edited);
                    self.load(&single).await;
                }
            }
            Err(e) => println!("Error: {}", e),
        }
        Ok(())
    }

    /// replace a table with the contents of a csv file, e.g. one edited by hand
    /// after an export
    #[tracing::instrument(skip(self, session))]
    pub async fn import(
        &self,
        session: &mut Session,
        table: &str,
        csv: &Path,
        load: bool,
    ) -> Result<()> {
        let data = std::fs::read(csv)
            .map_err(|e| anyhow!("could not read csv file {}: {}", csv.display(), e))?;
        let imported = from_csv(&data)?;
        session.update_table(table, imported.clone())?;
        print_table(table, &imported);

        if load {
            let mut single = IndexMap::new();
            single.insert(table.to_string(), imported);
            self.load(&single).await;
        }
        Ok(())
    }

    /// database failures are reported, never fatal to the session
    async fn load(&self, tables: &IndexMap<String, Table>) {
        match self.store() {
            Ok(store) => {
                for line in load_summary(&store.load_tables(tables).await) {
                    println!("{}", line);
                }
            }
            Err(e) => println!("Error: could not load data into the database: {}", e),
        }
    }
}

/// one error line per failed table, or a single success line
fn load_summary(results: &LoadResults) -> Vec<String> {
    let failures: Vec<String> = results
        .iter()
        .filter_map(|(name, result)| {
            result
                .as_ref()
                .err()
                .map(|e| format!("Error: could not load {} into the database: {}", name, e))
        })
        .collect();

    if !failures.is_empty() {
        let loaded = results.len() - failures.len();
        if loaded > 0 {
            let mut lines = failures;
            lines.push(format!("{} other table(s) loaded into postgres", loaded));
            return lines;
        }
        return failures;
    }
    vec!["data loaded into postgres".to_string()]
}

pub fn export(session: &Session, output: &Path) -> Result<()> {
    if !session.has_tables() {
        bail!("nothing to export: generate tables first");
    }

    let archive = export_zip(session.tables())?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, archive)?;

    tracing::info!(output = %output.display(), tables = session.tables().len(), "wrote export");
    println!("exported {} table(s) to {}", session.tables().len(), output.display());
    Ok(())
}

pub fn list_tables(session: &Session) {
    if !session.has_tables() {
        println!("no tables generated yet");
        return;
    }

    let selected = session.selected_table().map(|(name, _)| name);
    for (name, table) in session.tables() {
        let marker = if Some(name.as_str()) == selected { "*" } else { " " };
        match table.error() {
            Some(message) => println!("{} {} (failed: {})", marker, name, message),
            None => println!("{} {} ({} rows)", marker, name, table.len()),
        }
    }
}

pub fn show_table(session: &Session, name: Option<&str>) -> Result<()> {
    let (name, table) = match name {
        Some(name) => session
            .table(name)
            .map(|table| (name, table))
            .ok_or_else(|| anyhow!("no table named {}", name))?,
        None => session
            .selected_table()
            .ok_or_else(|| anyhow!("no table selected: generate tables first"))?,
    };
    print_table(name, table);
    Ok(())
}

fn print_table(name: &str, table: &Table) {
    println!("== {} ==", name);
    match table.error() {
        Some(message) => println!("Error: {}", message),
        None => println!("{}", table.render()),
    }
    println!();
}

pub fn print_history(session: &Session) {
    println!("{}", history_text(session));
}

fn history_text(session: &Session) -> String {
    if session.history().is_empty() {
        return "no questions asked yet".to_string();
    }

    session
        .history()
        .iter()
        .map(|message| {
            let speaker = match message.role {
                Role::User => "you",
                Role::Assistant => "datagen",
            };
            match &message.content {
                MessageContent::Text(text) => format!("{}: {}", speaker, text),
                MessageContent::Table(table) => format!("{}:\n{}", speaker, table.render()),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
