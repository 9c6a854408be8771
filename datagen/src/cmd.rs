use crate::app::{self, App};
use crate::shell;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::agent::GenerationOptions;
use common::config::Config;
use common::schema::parse_ddl;
use common::session::Session;
use common::tracing::init_tracing;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "datagen")]
#[command(about = "synthetic table data from sql ddl, generated by an llm", long_about = None)]
pub struct Cli {
    /// Session file holding the generated tables between commands
    #[arg(long, global = true, env = "DATAGEN_SESSION", default_value = ".datagen/session.json")]
    session: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a DDL file and print the table schemas as JSON
    Parse {
        /// DDL file with CREATE TABLE statements
        ddl: PathBuf,
    },
    /// Generate data for every table in a DDL file
    Generate {
        /// DDL file with CREATE TABLE statements
        #[arg(long)]
        ddl: PathBuf,

        #[command(flatten)]
        generation: GenerationArgs,

        /// Also write the generated tables to this ZIP archive
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Ask a question about the generated data
    Ask {
        question: String,

        /// Sampling temperature for the SQL translation
        #[arg(long, default_value_t = 0.0, value_parser = parse_temperature)]
        temperature: f32,
    },
    /// Edit a generated table with natural-language instructions
    Edit {
        instructions: String,

        /// Table to edit (default: the selected table)
        #[arg(long)]
        table: Option<String>,

        /// Keep the edit out of the database
        #[arg(long, default_value = "false")]
        no_load: bool,
    },
    /// Replace a generated table with the rows of a CSV file
    Load {
        /// Table to replace
        #[arg(long)]
        table: String,

        /// CSV file with a header row, e.g. an edited export entry
        csv: PathBuf,

        /// Keep the new rows out of the database
        #[arg(long, default_value = "false")]
        no_load: bool,
    },
    /// Print the questions asked so far and their answers
    History,
    /// Write every generated table to a ZIP archive of CSV files
    Export {
        #[arg(default_value = "generated_data.zip")]
        output: PathBuf,
    },
    /// Forget the generated tables and the question history
    Reset,
    /// Interactive session
    Shell {
        #[command(flatten)]
        generation: GenerationArgs,
    },
}

/// knobs shared by `generate` and the shell's generate command
#[derive(Args, Clone, Debug)]
pub struct GenerationArgs {
    /// Extra instructions appended to every table prompt
    #[arg(long, default_value = "")]
    prompt: String,

    /// Rows to generate per table
    #[arg(long, default_value_t = 5)]
    rows: usize,

    /// Sampling temperature, 0.0 to 1.0
    #[arg(long, default_value_t = 0.5, value_parser = parse_temperature)]
    temperature: f32,

    /// Output token budget per table
    #[arg(long, default_value_t = 2048, value_parser = clap::value_parser!(u32).range(1..))]
    max_tokens: u32,

    /// Gemini model id
    #[arg(long, env = "DATAGEN_MODEL")]
    model: Option<String>,

    /// Generate all tables concurrently
    #[arg(long, default_value = "false")]
    parallel: bool,

    /// Skip loading the generated tables into PostgreSQL
    #[arg(long, default_value = "false")]
    pub no_load: bool,
}

impl GenerationArgs {
    pub fn options(&self, default_model: &str) -> GenerationOptions {
        GenerationOptions {
            row_count: self.rows,
            temperature: self.temperature,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            extra_instructions: self.prompt.clone(),
            max_tokens: self.max_tokens,
            parallel: self.parallel,
        }
    }
}

fn parse_temperature(raw: &str) -> std::result::Result<f32, String> {
    let value: f32 = raw
        .parse()
        .map_err(|_| format!("`{}` is not a number", raw))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be between 0.0 and 1.0, got {}", value))
    }
}

pub fn read_ddl(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read ddl file {}", path.display()))
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let guard = init_tracing("datagen")?;
        let config = Config::from_env()?;
        let app = App::new(config, guard.is_exporting());

        match self.command {
            Commands::Parse { ddl } => {
                let schemas = parse_ddl(&read_ddl(&ddl)?);
                if schemas.is_empty() {
                    anyhow::bail!("no tables found in {}", ddl.display());
                }
                println!("{}", serde_json::to_string_pretty(&schemas)?);
                Ok(())
            }
            Commands::Generate {
                ddl,
                generation,
                export,
            } => {
                let ddl = read_ddl(&ddl)?;
                let mut session = Session::load(&self.session)?;
                let options = generation.options(app.model());

                app.generate(&mut session, &ddl, &options, !generation.no_load)
                    .await?;
                session.save(&self.session)?;

                if let Some(output) = export {
                    app::export(&session, &output)?;
                }
                Ok(())
            }
            Commands::Ask {
                question,
                temperature,
            } => {
                let mut session = Session::load(&self.session)?;
                app.ask(&mut session, &question, temperature).await?;
                session.save(&self.session)?;
                Ok(())
            }
            Commands::Edit {
                instructions,
                table,
                no_load,
            } => {
                let mut session = Session::load(&self.session)?;
                app.edit(&mut session, &instructions, table.as_deref(), !no_load)
                    .await?;
                session.save(&self.session)?;
                Ok(())
            }
            Commands::Load {
                table,
                csv,
                no_load,
            } => {
                let mut session = Session::load(&self.session)?;
                app.import(&mut session, &table, &csv, !no_load).await?;
                session.save(&self.session)?;
                Ok(())
            }
            Commands::History => {
                let session = Session::load(&self.session)?;
                app::print_history(&session);
                Ok(())
            }
            Commands::Export { output } => {
                let session = Session::load(&self.session)?;
                app::export(&session, &output)
            }
            Commands::Reset => {
                let mut session = Session::load(&self.session)?;
                session.reset();
                session.save(&self.session)?;
                println!("session cleared");
                Ok(())
            }
            Commands::Shell { generation } => shell::run(&app, &self.session, generation).await,
        }
    }
}
