use std::cmp::Ordering;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use cursive::{align::HAlign, traits::*, Cursive};
use cursive::{
    views::Button, views::Dialog, views::DummyView, views::EditView, views::LinearLayout,
    views::SelectView, views::TextArea, views::TextView,
};
use cursive_table_view::{TableView, TableViewItem};

use super::{format_timestamp, zone_label};
use crate::{
    codec::{self, CodecError},
    config::Config,
    fl,
    hash::{self, Algorithm, HashError},
    json::{self, JsonAction, JsonError, INDENT_CHOICES},
    timestamp::{current_time_to_both, ConvertError, ConverterState, TimezoneOffset},
    todo::{TodoItem, TodoStore},
};

/// Everything the dashboard keeps between callbacks
struct AppState {
    config: Config,
    converter: ConverterState,
    todos: TodoStore,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
enum Tool {
    Todo,
    Timestamp,
    Json,
    Base64,
    Hash,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
enum TodoColumn {
    Done,
    Task,
    Created,
    Completed,
}

#[derive(Clone, Debug)]
struct TodoRow {
    item: TodoItem,
    offset: TimezoneOffset,
}

impl TableViewItem<TodoColumn> for TodoRow {
    fn to_column(&self, column: TodoColumn) -> String {
        match column {
            TodoColumn::Done => {
                if self.item.completed {
                    " ✓".to_string()
                } else {
                    " ".to_string()
                }
            }
            TodoColumn::Task => self.item.text.clone(),
            TodoColumn::Created => format_timestamp(Some(self.item.created_at), self.offset),
            TodoColumn::Completed => match self.item.completed_at {
                Some(t) => format_timestamp(Some(t), self.offset),
                None => String::new(),
            },
        }
    }

    fn cmp(&self, other: &Self, column: TodoColumn) -> Ordering
    where
        Self: Sized,
    {
        match column {
            TodoColumn::Done => self.item.completed.cmp(&other.item.completed),
            TodoColumn::Task => self.item.text.cmp(&other.item.text),
            TodoColumn::Created => self.item.created_at.cmp(&other.item.created_at),
            TodoColumn::Completed => self.item.completed_at.cmp(&other.item.completed_at),
        }
    }
}

type TodoTable = TableView<TodoRow, TodoColumn>;

macro_rules! unwrap_or_show_error {
    ($siv:ident, $f:block) => {{
        let tmp = $f;
        match tmp {
            Ok(v) => v,
            Err(e) => {
                show_error($siv, &e.to_string());
                return;
            }
        }
    }};
}

fn show_error(siv: &mut Cursive, msg: &str) {
    siv.add_layer(
        Dialog::around(TextView::new(msg))
            .title(fl!("error"))
            .button(fl!("ok"), |s| {
                s.pop_layer();
            })
            .padding_lrtb(2, 2, 1, 1),
    );
}

fn show_message(siv: &mut Cursive, msg: &str) {
    siv.add_layer(
        Dialog::around(TextView::new(msg))
            .title(fl!("message"))
            .button(fl!("ok"), |s| {
                s.pop_layer();
            })
            .padding_lrtb(2, 2, 1, 1),
    );
}

fn tool_dialog<V: View>(siv: &mut Cursive, title: String, content: V) {
    siv.add_layer(
        Dialog::around(content)
            .title(title)
            .button(fl!("back"), |s| {
                s.pop_layer();
            })
            .padding_lrtb(2, 2, 1, 1),
    );
}

fn set_text(siv: &mut Cursive, name: &str, content: String) {
    siv.call_on_name(name, |v: &mut TextView| v.set_content(content));
}

fn get_text_area(siv: &mut Cursive, name: &str) -> String {
    siv.call_on_name(name, |v: &mut TextArea| v.get_content().to_string())
        .unwrap_or_default()
}

// === todo list

fn todo_rows(store: &TodoStore, offset: TimezoneOffset) -> Vec<TodoRow> {
    store
        .items()
        .iter()
        .map(|item| TodoRow {
            item: item.clone(),
            offset,
        })
        .collect()
}

fn refresh_todos(siv: &mut Cursive) {
    let Some(state) = siv.user_data::<AppState>() else {
        return;
    };
    let rows = todo_rows(&state.todos, state.config.timezone);
    let stats = state.todos.stats();
    siv.call_on_name("todo-table", |v: &mut TodoTable| v.set_items(rows));
    set_text(
        siv,
        "todo-stats",
        fl!(
            "todo-stats",
            total = stats.total,
            completed = stats.completed
        ),
    );
}

/// Applies `f` to the store, saving when it reports a change.
fn update_todos<F>(siv: &mut Cursive, f: F)
where
    F: FnOnce(&mut TodoStore) -> Result<bool>,
{
    let result = match siv.user_data::<AppState>() {
        Some(state) => f(&mut state.todos).and_then(|changed| {
            if changed {
                state.todos.save()
            } else {
                Ok(())
            }
        }),
        None => return,
    };
    if let Err(e) = result {
        show_error(siv, &format!("{:#}", e));
    }
    refresh_todos(siv);
}

fn selected_todo(siv: &mut Cursive) -> Option<i64> {
    siv.call_on_name("todo-table", |v: &mut TodoTable| {
        v.item().and_then(|i| v.borrow_item(i)).map(|r| r.item.id)
    })
    .flatten()
}

fn add_todo(siv: &mut Cursive) {
    let Some(text) = siv.call_on_name("todo-input", |v: &mut EditView| v.get_content()) else {
        return;
    };
    if text.trim().is_empty() {
        return;
    }
    update_todos(siv, |store| Ok(store.add(&text).is_some()));
    siv.call_on_name("todo-input", |v: &mut EditView| v.set_content(""));
}

fn delete_todo(siv: &mut Cursive) {
    let Some(id) = selected_todo(siv) else {
        show_message(siv, &fl!("todo-no-selection"));
        return;
    };
    update_todos(siv, |store| {
        store.delete(id)?;
        Ok(true)
    });
}

fn show_todos(siv: &mut Cursive) {
    let table = TodoTable::new()
        .column(TodoColumn::Done, "", |c| c.align(HAlign::Center).width(4))
        .column(TodoColumn::Task, fl!("todo-col-task"), |c| c)
        .column(TodoColumn::Created, fl!("todo-col-created"), |c| {
            c.ordering(Ordering::Less).width(21)
        })
        .column(TodoColumn::Completed, fl!("todo-col-completed"), |c| {
            c.width(21)
        })
        .default_column(TodoColumn::Created)
        .on_submit(|siv, _, index| {
            let id = siv
                .call_on_name("todo-table", |v: &mut TodoTable| {
                    v.borrow_item(index).map(|r| r.item.id)
                })
                .flatten();
            if let Some(id) = id {
                update_todos(siv, |store| {
                    store.toggle(id)?;
                    Ok(true)
                });
            }
        })
        .with_name("todo-table")
        .min_width(90)
        .min_height(15);

    let input = LinearLayout::horizontal()
        .child(
            EditView::new()
                .on_submit(|s, _| add_todo(s))
                .with_name("todo-input")
                .min_width(60),
        )
        .child(Button::new(fl!("todo-add"), add_todo));
    let actions = LinearLayout::horizontal()
        .child(TextView::new("").with_name("todo-stats"))
        .child(DummyView.full_width())
        .child(Button::new(fl!("todo-delete"), delete_todo))
        .child(Button::new(fl!("todo-complete-all"), |s| {
            update_todos(s, |store| Ok(store.complete_all() > 0))
        }))
        .child(Button::new(fl!("todo-delete-completed"), |s| {
            update_todos(s, |store| Ok(store.delete_completed() > 0))
        }));

    let content = LinearLayout::vertical()
        .child(input)
        .child(DummyView)
        .child(table)
        .child(DummyView)
        .child(actions);
    tool_dialog(siv, fl!("todo-title"), content);
    refresh_todos(siv);
}

// === timestamp converter

fn timestamp_error(e: &ConvertError) -> String {
    match e {
        ConvertError::EmptyInput => fl!("ts-empty-timestamp"),
        ConvertError::InvalidFormat(_) => fl!("ts-invalid-timestamp"),
    }
}

fn date_time_error(e: &ConvertError) -> String {
    match e {
        ConvertError::EmptyInput => fl!("ts-empty-date-time"),
        ConvertError::InvalidFormat(_) => fl!("ts-invalid-date-time"),
    }
}

fn read_converter(siv: &mut Cursive) -> Option<ConverterState> {
    let timestamp = siv.call_on_name("ts-timestamp", |v: &mut EditView| v.get_content())?;
    let date_time = siv.call_on_name("ts-date-time", |v: &mut EditView| v.get_content())?;
    let offset = siv.user_data::<AppState>()?.converter.offset;

    Some(ConverterState {
        timestamp: timestamp.to_string(),
        date_time: date_time.to_string(),
        offset,
    })
}

fn apply_converter(siv: &mut Cursive, next: ConverterState) {
    siv.call_on_name("ts-timestamp", |v: &mut EditView| {
        v.set_content(next.timestamp.as_str())
    });
    siv.call_on_name("ts-date-time", |v: &mut EditView| {
        v.set_content(next.date_time.as_str())
    });
    if let Some(state) = siv.user_data::<AppState>() {
        state.converter = next;
    }
}

fn to_date_time(siv: &mut Cursive) {
    let Some(state) = read_converter(siv) else {
        return;
    };
    let next = unwrap_or_show_error!(siv, {
        state.to_date_time().map_err(|e| timestamp_error(&e))
    });
    apply_converter(siv, next);
}

fn to_timestamp(siv: &mut Cursive) {
    let Some(state) = read_converter(siv) else {
        return;
    };
    let next = unwrap_or_show_error!(siv, {
        state.to_timestamp().map_err(|e| date_time_error(&e))
    });
    apply_converter(siv, next);
}

fn convert_both(siv: &mut Cursive) {
    let Some(state) = read_converter(siv) else {
        return;
    };
    let exchange = state.convert_both();
    apply_converter(siv, exchange.state);
    let errors = exchange
        .date_time_error
        .iter()
        .map(timestamp_error)
        .chain(exchange.timestamp_error.iter().map(date_time_error))
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        show_error(siv, &errors.join("\n"));
    }
}

fn use_now(siv: &mut Cursive) {
    let Some(state) = read_converter(siv) else {
        return;
    };
    let next = unwrap_or_show_error!(siv, { state.use_current_time() });
    apply_converter(siv, next);
}

fn refresh_clock(siv: &mut Cursive) {
    let offset = siv
        .user_data::<AppState>()
        .map(|s| s.converter.offset)
        .unwrap_or_default();
    let text = match current_time_to_both(offset) {
        Ok((date_time, ts)) => fl!(
            "ts-current",
            zone = offset.to_string(),
            now = date_time,
            timestamp = ts
        ),
        Err(e) => e.to_string(),
    };
    set_text(siv, "ts-clock", text);
}

/// Posts a clock refresh to the event loop every second until the UI is gone.
fn spawn_clock(siv: &Cursive) {
    let cb_sink = siv.cb_sink().clone();
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        if cb_sink.send(Box::new(refresh_clock)).is_err() {
            return;
        }
    });
}

fn show_timestamp(siv: &mut Cursive) {
    let Some(state) = siv.user_data::<AppState>().map(|s| s.converter.clone()) else {
        return;
    };
    let selected = TimezoneOffset::ALL
        .iter()
        .position(|o| *o == state.offset)
        .unwrap_or_default();
    let zones = SelectView::new()
        .popup()
        .with_all(TimezoneOffset::ALL.into_iter().map(|o| (zone_label(o), o)))
        .selected(selected)
        .on_submit(|s, offset: &TimezoneOffset| {
            let offset = *offset;
            if let Some(state) = s.user_data::<AppState>() {
                state.converter = state.converter.with_offset(offset);
            }
            refresh_clock(s);
        });

    let content = LinearLayout::vertical()
        .child(TextView::new("").with_name("ts-clock"))
        .child(DummyView)
        .child(
            LinearLayout::horizontal()
                .child(TextView::new(fl!("ts-timezone")).fixed_width(14))
                .child(zones),
        )
        .child(DummyView)
        .child(
            LinearLayout::horizontal()
                .child(TextView::new(fl!("ts-timestamp")).fixed_width(14))
                .child(
                    EditView::new()
                        .content(state.timestamp)
                        .on_submit(|s, _| to_date_time(s))
                        .with_name("ts-timestamp")
                        .fixed_width(32),
                )
                .child(Button::new(fl!("ts-to-date-time"), to_date_time)),
        )
        .child(
            LinearLayout::horizontal()
                .child(DummyView.fixed_width(14))
                .child(Button::new(fl!("ts-swap"), convert_both)),
        )
        .child(
            LinearLayout::horizontal()
                .child(TextView::new(fl!("ts-date-time")).fixed_width(14))
                .child(
                    EditView::new()
                        .content(state.date_time)
                        .on_submit(|s, _| to_timestamp(s))
                        .with_name("ts-date-time")
                        .fixed_width(32),
                )
                .child(Button::new(fl!("ts-to-timestamp"), to_timestamp)),
        )
        .child(DummyView)
        .child(Button::new(fl!("ts-use-now"), use_now))
        .child(DummyView)
        .child(TextView::new(fl!("ts-help")));
    tool_dialog(siv, fl!("ts-title"), content);
    refresh_clock(siv);
}

// === text tools

fn json_error(e: &JsonError, action: JsonAction) -> String {
    match e {
        JsonError::EmptyInput => fl!("json-empty"),
        JsonError::Parse(e) if action == JsonAction::Validate => {
            fl!("json-invalid", error = e.to_string())
        }
        JsonError::Parse(e) => fl!("json-parse-error", error = e.to_string()),
        JsonError::Indent(_) => e.to_string(),
    }
}

fn run_json(siv: &mut Cursive, action: JsonAction) {
    let input = get_text_area(siv, "json-input");
    let indent = siv
        .call_on_name("json-indent", |v: &mut SelectView<usize>| v.selection())
        .flatten()
        .map(|n| *n)
        .unwrap_or(2);
    let result = match action {
        JsonAction::Format => json::format(&input, indent),
        JsonAction::Compress => json::compress(&input),
        JsonAction::Validate => json::validate(&input).map(|_| fl!("json-valid")),
        JsonAction::Unescape => json::unescape(&input),
    };
    match result {
        Ok(output) => set_text(siv, "json-output", output),
        Err(e) => {
            set_text(siv, "json-output", String::new());
            show_error(siv, &json_error(&e, action));
        }
    }
}

fn show_json(siv: &mut Cursive) {
    let indent = siv
        .user_data::<AppState>()
        .map(|s| s.config.json_indent)
        .unwrap_or(2);
    let indents = SelectView::new()
        .popup()
        .with_all(
            INDENT_CHOICES
                .into_iter()
                .map(|n| (fl!("json-indent-spaces", count = n), n)),
        )
        .selected(INDENT_CHOICES.iter().position(|n| *n == indent).unwrap_or(0))
        .with_name("json-indent");
    let buttons = LinearLayout::horizontal()
        .child(Button::new(fl!("json-format"), |s| run_json(s, JsonAction::Format)))
        .child(indents)
        .child(DummyView)
        .child(Button::new(fl!("json-compress"), |s| {
            run_json(s, JsonAction::Compress)
        }))
        .child(Button::new(fl!("json-validate"), |s| {
            run_json(s, JsonAction::Validate)
        }))
        .child(Button::new(fl!("json-unescape"), |s| {
            run_json(s, JsonAction::Unescape)
        }));
    let content = LinearLayout::vertical()
        .child(TextView::new(fl!("input")))
        .child(TextArea::new().with_name("json-input").min_height(8))
        .child(buttons)
        .child(DummyView)
        .child(TextView::new(fl!("output")))
        .child(
            TextView::new("")
                .with_name("json-output")
                .scrollable()
                .min_height(10),
        )
        .min_width(80);
    tool_dialog(siv, fl!("json-title"), content);
}

fn codec_error(e: &CodecError) -> String {
    match e {
        CodecError::EmptyInput => fl!("b64-empty"),
        _ => fl!("b64-error", error = e.to_string()),
    }
}

fn run_base64(siv: &mut Cursive, decode: bool) {
    let input = get_text_area(siv, "b64-input");
    let result = if decode {
        codec::decode(&input)
    } else {
        codec::encode(&input)
    };
    let output = unwrap_or_show_error!(siv, { result.map_err(|e| codec_error(&e)) });
    set_text(siv, "b64-output", output);
}

fn show_base64(siv: &mut Cursive) {
    let content = LinearLayout::vertical()
        .child(TextView::new(fl!("input")))
        .child(TextArea::new().with_name("b64-input").min_height(6))
        .child(
            LinearLayout::horizontal()
                .child(Button::new(fl!("b64-encode"), |s| run_base64(s, false)))
                .child(Button::new(fl!("b64-decode"), |s| run_base64(s, true))),
        )
        .child(DummyView)
        .child(TextView::new(fl!("output")))
        .child(
            TextView::new("")
                .with_name("b64-output")
                .scrollable()
                .min_height(6),
        )
        .min_width(80);
    tool_dialog(siv, fl!("b64-title"), content);
}

fn run_hash(siv: &mut Cursive) {
    let input = get_text_area(siv, "hash-input");
    let algorithm = siv
        .call_on_name("hash-algo", |v: &mut SelectView<Algorithm>| v.selection())
        .flatten()
        .map(|a| *a)
        .unwrap_or_default();
    let sum = unwrap_or_show_error!(siv, {
        hash::digest(algorithm, &input).map_err(|e| match e {
            HashError::EmptyInput => fl!("hash-empty"),
            e => e.to_string(),
        })
    });
    set_text(siv, "hash-output", sum);
}

fn show_hash(siv: &mut Cursive) {
    let algorithms = SelectView::new()
        .popup()
        .with_all(
            Algorithm::ALL
                .into_iter()
                .map(|a| (a.name().to_uppercase(), a)),
        )
        .with_name("hash-algo");
    let content = LinearLayout::vertical()
        .child(TextView::new(fl!("input")))
        .child(TextArea::new().with_name("hash-input").min_height(6))
        .child(
            LinearLayout::horizontal()
                .child(TextView::new(fl!("hash-algorithm")))
                .child(algorithms)
                .child(DummyView)
                .child(Button::new(fl!("hash-calculate"), run_hash)),
        )
        .child(DummyView)
        .child(TextView::new(fl!("hash-result")))
        .child(TextView::new("").with_name("hash-output"))
        .min_width(80);
    tool_dialog(siv, fl!("hash-title"), content);
}

// === main menu

fn show_menu(siv: &mut Cursive) {
    let menu = SelectView::new()
        .item(fl!("menu-todo"), Tool::Todo)
        .item(fl!("menu-timestamp"), Tool::Timestamp)
        .item(fl!("menu-json"), Tool::Json)
        .item(fl!("menu-base64"), Tool::Base64)
        .item(fl!("menu-hash"), Tool::Hash)
        .on_submit(|siv, tool: &Tool| match tool {
            Tool::Todo => show_todos(siv),
            Tool::Timestamp => show_timestamp(siv),
            Tool::Json => show_json(siv),
            Tool::Base64 => show_base64(siv),
            Tool::Hash => show_hash(siv),
        })
        .min_width(30);
    siv.add_layer(
        Dialog::around(menu)
            .title(fl!("app-title"))
            .button(fl!("exit"), |siv| siv.quit())
            .padding_lrtb(2, 2, 1, 1),
    );
}

pub fn tui_main(config: Config) {
    let todos = TodoStore::open(&config.todo_path());
    let converter = ConverterState::new(config.timezone);
    let mut siv = cursive::default();
    siv.set_user_data(AppState {
        config,
        converter,
        todos,
    });
    spawn_clock(&siv);
    show_menu(&mut siv);
    siv.run();
}

// tests
#[test]
fn test_todo_row_columns() {
    let row = TodoRow {
        item: TodoItem {
            id: 1,
            text: "write docs".to_string(),
            completed: true,
            created_at: 1_700_000_000_000,
            completed_at: Some(1_700_000_060_000),
        },
        offset: TimezoneOffset::Utc,
    };
    assert_eq!(row.to_column(TodoColumn::Done), " ✓");
    assert_eq!(row.to_column(TodoColumn::Task), "write docs");
    assert_eq!(row.to_column(TodoColumn::Created), "2023-11-14 22:13:20");
    assert_eq!(row.to_column(TodoColumn::Completed), "2023-11-14 22:14:20");

    let open = TodoRow {
        item: TodoItem {
            completed: false,
            completed_at: None,
            ..row.item.clone()
        },
        offset: TimezoneOffset::Utc,
    };
    assert_eq!(open.to_column(TodoColumn::Completed), "");
    assert_eq!(row.cmp(&open, TodoColumn::Done), Ordering::Greater);
}

#[test]
fn test_error_messages() {
    assert_eq!(
        timestamp_error(&ConvertError::EmptyInput),
        fl!("ts-empty-timestamp")
    );
    assert_eq!(
        date_time_error(&ConvertError::InvalidFormat("x".to_string())),
        fl!("ts-invalid-date-time")
    );
    let err = json::validate("{").unwrap_err();
    assert!(json_error(&err, JsonAction::Validate).contains("EOF"));
}

#[test]
fn test_dashboard_without_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    let mut siv = Cursive::new();
    siv.set_user_data(AppState {
        converter: ConverterState::new(TimezoneOffset::Utc),
        todos: TodoStore::open(&config.todo_path()),
        config,
    });

    show_timestamp(&mut siv);
    siv.call_on_name("ts-timestamp", |v: &mut EditView| v.set_content("1700000000"));
    to_date_time(&mut siv);
    let date_time = siv
        .call_on_name("ts-date-time", |v: &mut EditView| v.get_content())
        .unwrap();
    assert_eq!(date_time.as_str(), "2023-11-14 22:13:20.000");

    siv.call_on_name("ts-timestamp", |v: &mut EditView| v.set_content(""));
    to_date_time(&mut siv);
    let converter = &siv.user_data::<AppState>().unwrap().converter;
    assert_eq!(converter.date_time, "2023-11-14 22:13:20.000");
    assert_eq!(converter.timestamp, "1700000000");
}
