use crate::app::{self, App};
use crate::cmd::{read_ddl, GenerationArgs};
use anyhow::Result;
use common::session::Session;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  generate <ddl-file> [prompt]   generate data for every table in the ddl file
  ask <question>                 translate a question to sql and run it
  edit <instructions>            edit the selected table
  load <table> <csv-file>        replace a table with the rows of a csv file
  select <table>                 choose the table that edits apply to
  tables                         list generated tables
  show [table]                   print a table (default: the selected one)
  history                        show the questions asked and their answers
  export [file]                  write all tables to a zip of csv files
  reset                          clear the session
  help                           show this message
  quit                           leave the shell";

const DEFAULT_EXPORT: &str = "generated_data.zip";
const ASK_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Generate { ddl: PathBuf, prompt: Option<String> },
    Ask(String),
    Edit(String),
    Load { table: String, csv: PathBuf },
    Select(String),
    Tables,
    Show(Option<String>),
    History,
    Export(PathBuf),
    Reset,
    Help,
    Quit,
}

/// parse one input line; blank lines are `Ok(None)`
fn parse_line(line: &str) -> std::result::Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let required = |what: &str| -> std::result::Result<String, String> {
        if rest.is_empty() {
            Err(format!("{} needs {}", word, what))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word.to_lowercase().as_str() {
        "generate" | "gen" => {
            let args = required("a ddl file")?;
            let (ddl, prompt) = match args.split_once(char::is_whitespace) {
                Some((ddl, prompt)) => (ddl.to_string(), Some(prompt.trim().to_string())),
                None => (args, None),
            };
            ShellCommand::Generate {
                ddl: PathBuf::from(ddl),
                prompt,
            }
        }
        "ask" => ShellCommand::Ask(required("a question")?),
        "edit" => ShellCommand::Edit(required("instructions")?),
        "load" => {
            let args = required("a table name and a csv file")?;
            match args.split_once(char::is_whitespace) {
                Some((table, csv)) => ShellCommand::Load {
                    table: table.to_string(),
                    csv: PathBuf::from(csv.trim()),
                },
                None => return Err(format!("{} needs a table name and a csv file", word)),
            }
        }
        "select" | "use" => ShellCommand::Select(required("a table name")?),
        "tables" => ShellCommand::Tables,
        "show" => ShellCommand::Show((!rest.is_empty()).then(|| rest.to_string())),
        "history" => ShellCommand::History,
        "export" => ShellCommand::Export(PathBuf::from(if rest.is_empty() {
            DEFAULT_EXPORT
        } else {
            rest
        })),
        "reset" => ShellCommand::Reset,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command `{}`; type `help`", other)),
    };
    Ok(Some(command))
}

/// read commands from stdin until `quit` or end of input; the session is
/// saved after every command that changes it
pub async fn run(app: &App, session_path: &Path, generation: GenerationArgs) -> Result<()> {
    let mut session = Session::load(session_path)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("datagen shell (model: {}); type `help` for commands", app.model());

    loop {
        print!("datagen> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        if command == ShellCommand::Quit {
            break;
        }

        match execute(app, &mut session, &generation, command).await {
            Ok(true) => session.save(session_path)?,
            Ok(false) => {}
            // a failed command never ends the shell
            Err(e) => println!("Error: {:#}", e),
        }
    }

    Ok(())
}

/// run one command; returns whether the session changed
async fn execute(
    app: &App,
    session: &mut Session,
    generation: &GenerationArgs,
    command: ShellCommand,
) -> Result<bool> {
    match command {
        ShellCommand::Generate { ddl, prompt } => {
            let ddl = read_ddl(&ddl)?;
            let mut options = generation.options(app.model());
            if let Some(prompt) = prompt {
                options.extra_instructions = prompt;
            }
            app.generate(session, &ddl, &options, !generation.no_load)
                .await?;
            Ok(true)
        }
        ShellCommand::Ask(question) => {
            app.ask(session, &question, ASK_TEMPERATURE).await?;
            Ok(true)
        }
        ShellCommand::Edit(instructions) => {
            app.edit(session, &instructions, None, !generation.no_load)
                .await?;
            Ok(true)
        }
        ShellCommand::Load { table, csv } => {
            app.import(session, &table, &csv, !generation.no_load)
                .await?;
            Ok(true)
        }
        ShellCommand::Select(name) => {
            session.select(&name)?;
            println!("selected {}", name);
            Ok(true)
        }
        ShellCommand::Tables => {
            app::list_tables(session);
            Ok(false)
        }
        ShellCommand::Show(name) => {
            app::show_table(session, name.as_deref())?;
            Ok(false)
        }
        ShellCommand::History => {
            app::print_history(session);
            Ok(false)
        }
        ShellCommand::Export(output) => {
            app::export(session, &output)?;
            Ok(false)
        }
        ShellCommand::Reset => {
            session.reset();
            println!("session cleared");
            Ok(true)
        }
        ShellCommand::Help => {
            println!("{}", HELP);
            Ok(false)
        }
        ShellCommand::Quit => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        assert_eq!(
            parse_line("generate shop.sql").unwrap(),
            Some(ShellCommand::Generate {
                ddl: PathBuf::from("shop.sql"),
                prompt: None
            })
        );
        assert_eq!(
            parse_line("  gen shop.sql  customers from lisbon ").unwrap(),
            Some(ShellCommand::Generate {
                ddl: PathBuf::from("shop.sql"),
                prompt: Some("customers from lisbon".to_string())
            })
        );
        assert!(parse_line("generate").is_err());
    }

    #[test]
    fn test_parse_text_commands() {
        assert_eq!(
            parse_line("ask What is the most expensive product?").unwrap(),
            Some(ShellCommand::Ask("What is the most expensive product?".to_string()))
        );
        assert_eq!(
            parse_line("EDIT set every price to 10").unwrap(),
            Some(ShellCommand::Edit("set every price to 10".to_string()))
        );
        assert_eq!(
            parse_line("select orders").unwrap(),
            Some(ShellCommand::Select("orders".to_string()))
        );
        assert!(parse_line("ask   ").is_err());
    }

    #[test]
    fn test_parse_load_and_history() {
        assert_eq!(
            parse_line("load users  out/users_data.csv").unwrap(),
            Some(ShellCommand::Load {
                table: "users".to_string(),
                csv: PathBuf::from("out/users_data.csv"),
            })
        );
        assert!(parse_line("load users").is_err());
        assert!(parse_line("load").is_err());
        assert_eq!(parse_line("history").unwrap(), Some(ShellCommand::History));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("tables").unwrap(), Some(ShellCommand::Tables));
        assert_eq!(parse_line("show").unwrap(), Some(ShellCommand::Show(None)));
        assert_eq!(
            parse_line("show users").unwrap(),
            Some(ShellCommand::Show(Some("users".to_string())))
        );
        assert_eq!(
            parse_line("export").unwrap(),
            Some(ShellCommand::Export(PathBuf::from("generated_data.zip")))
        );
        assert_eq!(
            parse_line("export out/data.zip").unwrap(),
            Some(ShellCommand::Export(PathBuf::from("out/data.zip")))
        );
        assert_eq!(parse_line("reset").unwrap(), Some(ShellCommand::Reset));
        assert_eq!(parse_line("exit").unwrap(), Some(ShellCommand::Quit));
        assert!(parse_line("drop table users").is_err());
    }
}
