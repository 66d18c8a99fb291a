use std::{
    fs,
    io::{self, Read, Write},
};

use anyhow::{anyhow, Context, Result};
use argh::FromArgs;
use log::debug;
use tabwriter::TabWriter;

use super::{format_timestamp, zone_label};
use crate::{
    codec,
    config::Config,
    fl,
    hash::{self, Algorithm},
    json::{self, JsonAction},
    timestamp::{self, TimezoneOffset},
    todo::TodoStore,
};

#[derive(FromArgs, PartialEq, Debug)]
/// convert a timestamp to a date-time (10 digits or fewer are seconds, longer are milliseconds)
#[argh(subcommand, name = "ts")]
pub(crate) struct TimestampToDate {
    /// the timestamp
    #[argh(positional)]
    pub timestamp: String,
    /// timezone offset: UTC+8, UTC+0, UTC-8, UTC+1 or UTC+9
    #[argh(option, short = 'z')]
    pub zone: Option<TimezoneOffset>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// convert a date-time (YYYY-MM-DD HH:mm:ss[.SSS]) to a timestamp
#[argh(subcommand, name = "dt")]
pub(crate) struct DateToTimestamp {
    /// the date and time, e.g. 2024-01-01 08:00:00.000
    #[argh(positional)]
    pub date_time: Vec<String>,
    /// timezone offset: UTC+8, UTC+0, UTC-8, UTC+1 or UTC+9
    #[argh(option, short = 'z')]
    pub zone: Option<TimezoneOffset>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// show the current time and its millisecond timestamp
#[argh(subcommand, name = "now")]
pub(crate) struct Now {
    /// timezone offset: UTC+8, UTC+0, UTC-8, UTC+1 or UTC+9
    #[argh(option, short = 'z')]
    pub zone: Option<TimezoneOffset>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// format, compress, validate or unescape JSON read from a file or stdin
#[argh(subcommand, name = "json")]
pub(crate) struct JsonCommand {
    /// one of format, compress, validate, unescape
    #[argh(option, short = 'm', default = "JsonAction::Format")]
    pub mode: JsonAction,
    /// indent width for format: 2, 4 or 8
    #[argh(option, short = 'i')]
    pub indent: Option<usize>,
    /// input file, stdin when omitted
    #[argh(positional)]
    pub file: Option<String>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// encode or decode Base64
#[argh(subcommand, name = "base64")]
pub(crate) struct Base64Command {
    /// decode instead of encode
    #[argh(switch, short = 'd')]
    pub decode: bool,
    /// input text, stdin when omitted
    #[argh(positional)]
    pub text: Option<String>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// calculate a hex digest
#[argh(subcommand, name = "hash")]
pub(crate) struct HashCommand {
    /// one of md5, sha1, sha256, sha512, sha3, keccak512
    #[argh(option, short = 'a', default = "Algorithm::Md5")]
    pub algorithm: Algorithm,
    /// input text, stdin when omitted
    #[argh(positional)]
    pub text: Option<String>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// list tasks
#[argh(subcommand, name = "list")]
pub(crate) struct TodoListTasks {}

#[derive(FromArgs, PartialEq, Debug)]
/// add a task
#[argh(subcommand, name = "add")]
pub(crate) struct TodoAdd {
    /// task text
    #[argh(positional)]
    pub text: Vec<String>,
}

#[derive(FromArgs, PartialEq, Debug)]
/// mark a task done, or open again
#[argh(subcommand, name = "toggle")]
pub(crate) struct TodoToggle {
    /// id of the task
    #[argh(positional)]
    pub id: i64,
}

#[derive(FromArgs, PartialEq, Debug)]
/// delete a task
#[argh(subcommand, name = "remove")]
pub(crate) struct TodoRemove {
    /// id of the task
    #[argh(positional)]
    pub id: i64,
}

#[derive(FromArgs, PartialEq, Debug)]
/// mark every task done
#[argh(subcommand, name = "complete-all")]
pub(crate) struct TodoCompleteAll {}

#[derive(FromArgs, PartialEq, Debug)]
/// delete finished tasks
#[argh(subcommand, name = "clear-done")]
pub(crate) struct TodoClearDone {}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum TodoSubcommand {
    List(TodoListTasks),
    Add(TodoAdd),
    Toggle(TodoToggle),
    Remove(TodoRemove),
    CompleteAll(TodoCompleteAll),
    ClearDone(TodoClearDone),
}

#[derive(FromArgs, PartialEq, Debug)]
/// manage the todo list
#[argh(subcommand, name = "todo")]
pub(crate) struct TodoCommand {
    #[argh(subcommand)]
    pub command: Option<TodoSubcommand>,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum ToolsetCommand {
    Ts(TimestampToDate),
    Dt(DateToTimestamp),
    Now(Now),
    Json(JsonCommand),
    Base64(Base64Command),
    Hash(HashCommand),
    Todo(TodoCommand),
}

#[derive(FromArgs, PartialEq, Debug)]
/// Toolset: todo list, timestamp, JSON, Base64 and hash tools.
/// Starts the interactive dashboard when no command is given.
pub(crate) struct Toolset {
    #[argh(subcommand)]
    pub command: Option<ToolsetCommand>,
}

// === end of argh constructs

fn read_text(text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;

    Ok(buf)
}

fn print_todos<W: Write>(store: &TodoStore, offset: TimezoneOffset, out: W) -> Result<()> {
    let mut tw = TabWriter::new(out);
    writeln!(
        tw,
        "{}\t{}\t{}\t{}",
        fl!("todo-col-id"),
        fl!("todo-col-done"),
        fl!("todo-col-created"),
        fl!("todo-col-task")
    )?;
    for item in store.items() {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            item.id,
            if item.completed { "✓" } else { " " },
            format_timestamp(Some(item.created_at), offset),
            item.text
        )?;
    }
    let stats = store.stats();
    writeln!(
        tw,
        "\n{}",
        fl!(
            "todo-stats",
            total = stats.total,
            completed = stats.completed
        )
    )?;
    tw.flush()?;

    Ok(())
}

fn run_todo<W: Write>(
    command: Option<TodoSubcommand>,
    store: &mut TodoStore,
    offset: TimezoneOffset,
    out: &mut W,
) -> Result<()> {
    let changed = match command {
        None | Some(TodoSubcommand::List(_)) => false,
        Some(TodoSubcommand::Add(add)) => {
            let id = store
                .add(&add.text.join(" "))
                .ok_or_else(|| anyhow!(fl!("todo-empty-input")))?;
            writeln!(out, "{}", fl!("todo-added", id = id.to_string()))?;
            true
        }
        Some(TodoSubcommand::Toggle(toggle)) => {
            store.toggle(toggle.id)?;
            if let Some(item) = store.get(toggle.id) {
                let task = item.text.clone();
                let message = if item.completed {
                    fl!("todo-completed", task = task)
                } else {
                    fl!("todo-reopened", task = task)
                };
                writeln!(out, "{}", message)?;
            }
            true
        }
        Some(TodoSubcommand::Remove(remove)) => {
            store.delete(remove.id)?;
            true
        }
        Some(TodoSubcommand::CompleteAll(_)) => store.complete_all() > 0,
        Some(TodoSubcommand::ClearDone(_)) => store.delete_completed() > 0,
    };
    if changed {
        store.save()?;
    }

    print_todos(store, offset, out)
}

/// Executes one command, writing its result to `out`.
pub(crate) fn run<W: Write>(command: ToolsetCommand, config: &Config, out: &mut W) -> Result<()> {
    match command {
        ToolsetCommand::Ts(args) => {
            let offset = args.zone.unwrap_or(config.timezone);
            let date_time = timestamp::timestamp_to_date_time(&args.timestamp, offset)?;
            writeln!(out, "{}", date_time)?;
        }
        ToolsetCommand::Dt(args) => {
            let offset = args.zone.unwrap_or(config.timezone);
            let ts = timestamp::date_time_to_timestamp(&args.date_time.join(" "), offset)?;
            writeln!(out, "{}", ts)?;
        }
        ToolsetCommand::Now(args) => {
            let offset = args.zone.unwrap_or(config.timezone);
            let (date_time, ts) = timestamp::current_time_to_both(offset)?;
            writeln!(out, "{}\t{}", zone_label(offset), date_time)?;
            writeln!(out, "{}", ts)?;
        }
        ToolsetCommand::Json(args) => {
            let input = match args.file {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path))?,
                None => read_text(None)?,
            };
            let output = match args.mode {
                JsonAction::Format => {
                    json::format(&input, args.indent.unwrap_or(config.json_indent))?
                }
                JsonAction::Compress => json::compress(&input)?,
                JsonAction::Validate => {
                    json::validate(&input)?;
                    fl!("json-valid")
                }
                JsonAction::Unescape => json::unescape(&input)?,
            };
            writeln!(out, "{}", output)?;
        }
        ToolsetCommand::Base64(args) => {
            let input = read_text(args.text)?;
            let output = if args.decode {
                codec::decode(&input)?
            } else {
                codec::encode(&input)?
            };
            writeln!(out, "{}", output)?;
        }
        ToolsetCommand::Hash(args) => {
            let sum = match args.text {
                Some(text) => hash::digest(args.algorithm, &text)?,
                None => hash::hexsum_reader(args.algorithm, io::stdin().lock())?,
            };
            writeln!(out, "{}", sum)?;
        }
        ToolsetCommand::Todo(args) => {
            let mut store = TodoStore::open(&config.todo_path());
            debug!("Using todo list at {}", store.path().display());
            run_todo(args.command, &mut store, config.timezone, out)?;
        }
    }

    Ok(())
}

/// CLI parser and main function.
/// Returns `false` if no command-line argument is provided.
pub fn cli_main(config: &Config) -> Result<bool> {
    let args: Toolset = argh::from_env();
    let Some(command) = args.command else {
        return Ok(false);
    };
    run(command, config, &mut io::stdout().lock())?;

    Ok(true)
}

// tests
#[cfg(test)]
fn parse_args(args: &[&str]) -> ToolsetCommand {
    Toolset::from_args(&["toolset"], args)
        .unwrap()
        .command
        .unwrap()
}

#[cfg(test)]
fn run_to_string(args: &[&str], config: &Config) -> String {
    let mut out = Vec::new();
    run(parse_args(args), config, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_parse_commands() {
    assert_eq!(
        parse_args(&["ts", "1700000000", "-z", "UTC+9"]),
        ToolsetCommand::Ts(TimestampToDate {
            timestamp: "1700000000".to_string(),
            zone: Some(TimezoneOffset::UtcPlus9),
        })
    );
    assert_eq!(
        parse_args(&["hash", "-a", "sha256", "abc"]),
        ToolsetCommand::Hash(HashCommand {
            algorithm: Algorithm::Sha256,
            text: Some("abc".to_string()),
        })
    );
    assert!(Toolset::from_args(&["toolset"], &["ts", "1", "-z", "UTC+5"]).is_err());
    assert!(Toolset::from_args(&["toolset"], &[]).unwrap().command.is_none());
}

#[test]
fn test_timestamp_commands() {
    let config = Config::default();
    assert_eq!(
        run_to_string(&["ts", "1700000000"], &config),
        "2023-11-15 06:13:20.000\n"
    );
    assert_eq!(
        run_to_string(&["dt", "2024-01-01", "00:00:00", "-z", "UTC+0"], &config),
        "1704067200\n"
    );
    let config = Config {
        timezone: TimezoneOffset::Utc,
        ..Config::default()
    };
    assert_eq!(
        run_to_string(&["dt", "2024-01-01 00:00:00.250"], &config),
        "1704067200250\n"
    );
    let mut out = Vec::new();
    assert!(run(parse_args(&["ts", "soon"]), &config, &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn test_text_commands() {
    let config = Config::default();
    assert_eq!(run_to_string(&["base64", "hello"], &config), "aGVsbG8=\n");
    assert_eq!(run_to_string(&["base64", "-d", "aGVsbG8="], &config), "hello\n");
    assert_eq!(
        run_to_string(&["hash", "abc"], &config),
        "900150983cd24fb0d6963f7d28e17f72\n"
    );
}

#[test]
fn test_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.json");
    fs::write(&path, r#"{"a": [1, 2]}"#).unwrap();
    let path = path.to_str().unwrap();
    let config = Config::default();
    assert_eq!(
        run_to_string(&["json", "-m", "compress", path], &config),
        "{\"a\":[1,2]}\n"
    );
    assert_eq!(
        run_to_string(&["json", "-i", "4", path], &config),
        "{\n    \"a\": [\n        1,\n        2\n    ]\n}\n"
    );
}

#[test]
fn test_todo_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let mut store = TodoStore::open(&path);
    let mut out = Vec::new();
    run_todo(
        Some(TodoSubcommand::Add(TodoAdd {
            text: vec!["buy".to_string(), "milk".to_string()],
        })),
        &mut store,
        TimezoneOffset::Utc,
        &mut out,
    )
    .unwrap();
    let id = store.items()[0].id;
    assert_eq!(store.items()[0].text, "buy milk");

    run_todo(
        Some(TodoSubcommand::Toggle(TodoToggle { id })),
        &mut store,
        TimezoneOffset::Utc,
        &mut out,
    )
    .unwrap();
    let reloaded = TodoStore::open(&path);
    assert!(reloaded.get(id).unwrap().completed);
    let listing = String::from_utf8(out.clone()).unwrap();
    assert!(listing.contains(&fl!("todo-completed", task = "buy milk")));

    assert!(run_todo(
        Some(TodoSubcommand::Remove(TodoRemove { id: id + 1 })),
        &mut store,
        TimezoneOffset::Utc,
        &mut out,
    )
    .is_err());
    let listing = String::from_utf8(out).unwrap();
    assert!(listing.contains("buy milk"));
}
