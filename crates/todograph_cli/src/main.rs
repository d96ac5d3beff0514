//! Local command line over the todograph core service.
//!
//! # Responsibility
//! - Create, list and delete tasks against a SQLite file.
//! - Print the critical path and earliest-start dates.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use todograph_core::db::open_db;
use todograph_core::{
    default_log_level, init_logging, LoggingConfig, NewTodo, SqliteTodoRepository, TodoDetails,
    TodoId, TodoService,
};

#[derive(Debug, Parser)]
#[command(name = "todograph", version, about = "Todo tasks with dependency analysis")]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, default_value = "todograph.sqlite3")]
    db: PathBuf,
    /// Directory for log files; defaults to a temp subdirectory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a task.
    Add {
        title: String,
        /// Due date as YYYY-MM-DD (UTC).
        #[arg(long)]
        due: Option<String>,
        /// Id of a task this one depends on; repeatable.
        #[arg(long = "dep")]
        deps: Vec<TodoId>,
    },
    /// List tasks, newest first.
    List,
    /// Show the critical path and earliest start dates.
    Path,
    /// Replace a task's dependencies.
    Deps { id: TodoId, deps: Vec<TodoId> },
    /// Delete a task.
    Delete { id: TodoId },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match cli.log_dir {
        Some(dir) if dir.is_relative() => std::env::current_dir()?.join(dir),
        Some(dir) => dir,
        None => std::env::temp_dir().join("todograph"),
    };
    init_logging(&LoggingConfig::new(default_log_level(), log_dir))
        .context("failed to initialize logging")?;

    let mut conn =
        open_db(&cli.db).with_context(|| format!("failed to open `{}`", cli.db.display()))?;
    let repo = SqliteTodoRepository::try_new(&mut conn)?;
    let mut service = TodoService::new(repo);
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );

    match cli.command {
        Command::Add { title, due, deps } => {
            let mut new_todo = NewTodo::new(title).depends_on(deps);
            if let Some(due) = due {
                new_todo = new_todo.due_at(parse_date(&due)?);
            }
            let created = service.create_todo(new_todo, None)?;
            println!("created {}", describe(&created));
        }
        Command::List => {
            let now = service.now();
            for details in service.list_todos()? {
                let marker = if details.todo.is_overdue(now) { "!" } else { " " };
                println!("{marker} {}", describe(&details));
            }
        }
        Command::Path => {
            let report = service.critical_path_report()?;
            let chain: Vec<String> = report
                .critical_path
                .iter()
                .map(|todo| format!("#{} {}", todo.id, todo.title))
                .collect();
            println!("critical path: {}", chain.join(" -> "));
            for (id, start) in &report.earliest_start_dates {
                println!("  #{id} earliest start {}", format_ms(*start));
            }
        }
        Command::Deps { id, deps } => {
            let updated = service.replace_dependencies(id, &deps)?;
            println!("updated {}", describe(&updated));
        }
        Command::Delete { id } => {
            service.delete_todo(id)?;
            println!("deleted #{id}");
        }
    }

    Ok(())
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::List => "list",
            Self::Path => "path",
            Self::Deps { .. } => "deps",
            Self::Delete { .. } => "delete",
        }
    }
}

fn parse_date(raw: &str) -> Result<i64> {
    let Some(midnight) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    else {
        bail!("invalid date `{raw}`, expected YYYY-MM-DD");
    };
    Ok(midnight.and_utc().timestamp_millis())
}

fn format_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|date| date.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn describe(details: &TodoDetails) -> String {
    let todo = &details.todo;
    let mut line = format!("#{} {}", todo.id, todo.title);
    if let Some(due) = todo.due_at {
        line.push_str(&format!(" (due {})", format_ms(due)));
    }
    if !details.dependencies.is_empty() {
        let deps: Vec<String> = details
            .dependencies
            .iter()
            .map(|dep| format!("#{}", dep.id))
            .collect();
        line.push_str(&format!(" after {}", deps.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{parse_date, Cli};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dates_parse_as_utc_midnight() {
        assert_eq!(parse_date("2024-01-10").unwrap(), 1_704_844_800_000);
        assert!(parse_date("10/01/2024").is_err());
    }
}
