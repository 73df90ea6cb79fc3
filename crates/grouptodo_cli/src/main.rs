//! GroupTodo command-line front end.
//!
//! # Responsibility
//! - Translate one command into one store operation per invocation.
//! - Reject blank titles/texts before they reach the store.
//! - Re-render the collection from store notifications after each change.
//!   A failed re-render is logged and never fails the command.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use grouptodo_core::db::open_db;
use grouptodo_core::{
    core_version, init_logging, Collection, GroupId, SlotRepository, SqliteSlotRepository,
    StoreConfig, StoreError, StoreResult, TodoColor, TodoId, TodoStore,
};
use log::{info, warn};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Parser)]
#[command(name = "grouptodo", version, about = "Grouped todo lists with local persistence")]
struct Cli {
    /// SQLite file holding the snapshot (overrides GROUPTODO_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Slot key inside the database (overrides GROUPTODO_SLOT_KEY)
    #[arg(long, global = true)]
    slot: Option<String>,

    /// Absolute directory for rolling logs (overrides GROUPTODO_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides GROUPTODO_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show all groups and todos
    List,
    /// Create, remove or rename groups
    Group {
        #[command(subcommand)]
        action: GroupCommand,
    },
    /// Add, remove or edit todos
    Todo {
        #[command(subcommand)]
        action: TodoCommand,
    },
    /// Move a todo by position, within a group or into another group
    Move {
        source_group: String,
        source_index: usize,
        dest_group: String,
        dest_index: usize,
    },
    /// Remove every group and todo
    Reset,
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    Add {
        title: String,
    },
    Rm {
        group: String,
    },
    Rename {
        group: String,
        title: String,
    },
}

#[derive(Debug, Subcommand)]
enum TodoCommand {
    Add {
        group: String,
        text: String,
        #[arg(long, default_value = "default", value_parser = parse_color)]
        color: TodoColor,
    },
    Rm {
        group: String,
        todo: String,
    },
    Toggle {
        group: String,
        todo: String,
    },
    Color {
        group: String,
        todo: String,
        #[arg(value_parser = parse_color)]
        color: TodoColor,
    },
    Edit {
        group: String,
        todo: String,
        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli, StoreConfig::from_env());

    if let Some(log_dir) = &config.log_dir {
        let log_dir = log_dir
            .to_str()
            .context("log directory must be valid UTF-8")?;
        init_logging(&config.log_level, log_dir).map_err(anyhow::Error::msg)?;
    }
    info!(
        "event=cli_start module=cli status=ok core_version={}",
        core_version()
    );

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let repo = SqliteSlotRepository::try_new(&conn)?;
    let mut store = TodoStore::load(repo, config.slot_key.clone());

    let command = cli.command.unwrap_or(Command::List);
    if !matches!(command, Command::List) {
        store.subscribe(|snapshot: &Arc<Collection>| {
            render_or_warn(&mut io::stdout().lock(), snapshot);
        });
    }
    run(&mut store, command, &mut io::stdout().lock())
}

fn resolve_config(cli: &Cli, mut config: StoreConfig) -> StoreConfig {
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(slot) = &cli.slot {
        config.slot_key = slot.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone();
    }
    config
}

fn run<R: SlotRepository>(
    store: &mut TodoStore<R>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    let snapshot = store.snapshot();
    match command {
        Command::List => render(out, &snapshot)?,
        Command::Group { action } => match action {
            GroupCommand::Add { title } => {
                let title = require_text(&title, "group title")?;
                let group_id = store.create_group(title)?;
                writeln!(out, "created group {group_id}")?;
            }
            GroupCommand::Rm { group } => {
                let group_id = resolve_group(&snapshot, &group)?;
                finish(out, store.delete_group(&group_id))?;
            }
            GroupCommand::Rename { group, title } => {
                let group_id = resolve_group(&snapshot, &group)?;
                let title = require_text(&title, "group title")?;
                finish(out, store.rename_group(&group_id, title))?;
            }
        },
        Command::Todo { action } => match action {
            TodoCommand::Add { group, text, color } => {
                let group_id = resolve_group(&snapshot, &group)?;
                let text = require_text(&text, "todo text")?;
                match store.add_todo(&group_id, text, color) {
                    Ok(todo_id) => writeln!(out, "created todo {todo_id}")?,
                    Err(err) => finish(out, Err(err))?,
                }
            }
            TodoCommand::Rm { group, todo } => {
                let (group_id, todo_id) = resolve_todo(&snapshot, &group, &todo)?;
                finish(out, store.delete_todo(&group_id, &todo_id))?;
            }
            TodoCommand::Toggle { group, todo } => {
                let (group_id, todo_id) = resolve_todo(&snapshot, &group, &todo)?;
                finish(out, store.toggle_todo(&group_id, &todo_id))?;
            }
            TodoCommand::Color { group, todo, color } => {
                let (group_id, todo_id) = resolve_todo(&snapshot, &group, &todo)?;
                finish(out, store.set_todo_color(&group_id, &todo_id, color))?;
            }
            TodoCommand::Edit { group, todo, text } => {
                let (group_id, todo_id) = resolve_todo(&snapshot, &group, &todo)?;
                let text = require_text(&text, "todo text")?;
                finish(out, store.set_todo_text(&group_id, &todo_id, text))?;
            }
        },
        Command::Move {
            source_group,
            source_index,
            dest_group,
            dest_index,
        } => {
            let source = resolve_group(&snapshot, &source_group)?;
            let dest = resolve_group(&snapshot, &dest_group)?;
            if source == dest && source_index == dest_index {
                writeln!(out, "nothing to move")?;
            } else {
                finish(out, store.move_todo(&source, &dest, source_index, dest_index))?;
            }
        }
        Command::Reset => store.clear()?,
    }
    Ok(())
}

/// Reports reference misses as a note; everything else is a hard error.
fn finish(out: &mut impl Write, result: StoreResult<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_noop() => {
            writeln!(out, "note: {err}; nothing changed")?;
            Ok(())
        }
        Err(err) => Err(to_anyhow(err)),
    }
}

fn to_anyhow(err: StoreError) -> anyhow::Error {
    anyhow::Error::new(err).context("store update was applied but not saved")
}

/// Renders for a store notification; returns whether the output was written.
fn render_or_warn(out: &mut impl Write, collection: &Collection) -> bool {
    match render(out, collection).and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                "event=render module=cli status=error kind={:?} groups={}",
                err.kind(),
                collection.len()
            );
            false
        }
    }
}

fn render(out: &mut impl Write, collection: &Collection) -> io::Result<()> {
    if collection.is_empty() {
        return writeln!(out, "no groups yet; add one with `grouptodo group add <TITLE>`");
    }
    for group in collection.groups() {
        writeln!(
            out,
            "{}  [{}/{} done]  ({})",
            group.title,
            group.completed_count(),
            group.todos.len(),
            short_id(&group.id)
        )?;
        for (index, todo) in group.todos.iter().enumerate() {
            let mark = if todo.completed { 'x' } else { ' ' };
            let color = match todo.color {
                TodoColor::Default => String::new(),
                other => format!("  <{other}>"),
            };
            writeln!(
                out,
                "  {index}. [{mark}] {}{color}  ({})",
                todo.text,
                short_id(&todo.id)
            )?;
        }
    }
    Ok(())
}

fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

fn require_text(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{what} must not be blank");
    }
    Ok(trimmed.to_string())
}

fn parse_color(value: &str) -> Result<TodoColor, String> {
    TodoColor::parse(value).ok_or_else(|| {
        let names: Vec<&str> = TodoColor::ALL.iter().map(TodoColor::as_str).collect();
        format!("unknown color `{value}`; expected one of {}", names.join("|"))
    })
}

fn resolve_group(collection: &Collection, reference: &str) -> Result<GroupId> {
    resolve_id(
        reference,
        collection.groups().iter().map(|group| group.id.as_str()),
        "group",
    )
}

fn resolve_todo(
    collection: &Collection,
    group_reference: &str,
    todo_reference: &str,
) -> Result<(GroupId, TodoId)> {
    let group_id = resolve_group(collection, group_reference)?;
    let todos = collection
        .group(&group_id)
        .map(|group| group.todos.as_slice())
        .unwrap_or_default();
    let todo_id = resolve_id(
        todo_reference,
        todos.iter().map(|todo| todo.id.as_str()),
        "todo",
    )?;
    Ok((group_id, todo_id))
}

/// Resolves an exact id, a unique case-insensitive id prefix, or a
/// well-formed UUID. A UUID that matches nothing is passed through so the
/// store can report it.
fn resolve_id<'a>(
    reference: &str,
    candidates: impl Iterator<Item = &'a str>,
    kind: &str,
) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        bail!("{kind} reference must not be blank");
    }

    let prefix = reference.to_ascii_lowercase();
    let mut matches = Vec::new();
    for id in candidates {
        if id == reference {
            return Ok(id.to_string());
        }
        if id.to_ascii_lowercase().starts_with(&prefix) {
            matches.push(id);
        }
    }
    if matches.is_empty() {
        if let Ok(parsed) = Uuid::parse_str(reference) {
            return Ok(parsed.to_string());
        }
    }
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => bail!("no {kind} id starts with `{reference}`"),
        _ => bail!(
            "{kind} reference `{reference}` is ambiguous ({} matches)",
            matches.len()
        ),
    }
}
