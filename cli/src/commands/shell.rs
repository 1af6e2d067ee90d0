//! Interactive session over one [`EventsController`]. The controller lives
//! as long as the session, so filters, toasts and the undo payload carry
//! over between commands.

use std::fmt::Write as _;

use ledger_core::chips::ChipKey;
use ledger_core::error::FilterError;
use ledger_core::filters::FilterKey;
use ledger_core::form::EventForm;
use ledger_core::view::{Density, ViewMode};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::open_controller;
use crate::api::LedgerApi;
use crate::controller::EventsController;
use crate::render;
use crate::store::KeyValueStore;
use crate::util::{is_yes, split_list};

const HELP: &str = "\
Commands:
  list | refresh              reload the current page
  search <text>               set the search text (empty clears it)
  filter <key> <value>        set a filter (agent, tool, tag, type, severity, source, from, to)
  unfilter <key>              remove one filter chip (or 'search')
  clear                       remove every filter
  chips                       show active filters
  next | prev | page <n>      paginate
  limit <n>                   set the page size
  view list|timeline          switch the view
  density comfortable|compact change row density
  column <key>                show/hide a column
  refs                        list agents, tools and tags
  create key=value ...        create an event (title, type, severity, source, time,
                              description, agents, tool, from, to, tags, metadata)
  delete <id>                 delete an event (asks for confirmation)
  undo                        restore the last deleted event
  action <toast>              run the action of a toast
  dismiss <toast>             dismiss a toast
  toasts                      show notifications
  quit                        leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Refresh,
    Search(String),
    Filter(FilterKey, String),
    Unfilter(ChipKey),
    Clear,
    Chips,
    Next,
    Prev,
    Page(u32),
    Limit(u32),
    View(ViewMode),
    Density(Density),
    Column(String),
    Refs,
    Create(Vec<(String, String)>),
    Delete(i64),
    Undo,
    Action(i64),
    Dismiss(i64),
    Toasts,
    Quit,
}

/// Split a line into words, keeping double-quoted runs together.
pub fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if has_word {
        words.push(current);
    }
    Ok(words)
}

fn number<T: std::str::FromStr>(word: Option<&String>, what: &str) -> Result<T, String> {
    let raw = word.ok_or_else(|| format!("missing {what}"))?;
    raw.parse().map_err(|_| format!("'{raw}' is not a valid {what}"))
}

pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let words = split_args(line)?;
    let Some((head, rest)) = words.split_first() else {
        return Ok(None);
    };
    let joined = rest.join(" ");
    let command = match head.as_str() {
        "help" | "?" => ShellCommand::Help,
        "list" | "refresh" | "r" => ShellCommand::Refresh,
        "search" | "s" => ShellCommand::Search(joined),
        "filter" | "f" => {
            let (key, value) = rest.split_first().ok_or("usage: filter <key> <value>")?;
            let key: FilterKey = key.parse().map_err(|e: FilterError| e.to_string())?;
            ShellCommand::Filter(key, value.join(" "))
        }
        "unfilter" | "rm" => {
            let key = rest.first().ok_or("usage: unfilter <key>")?;
            ShellCommand::Unfilter(key.parse().map_err(|e: FilterError| e.to_string())?)
        }
        "clear" => ShellCommand::Clear,
        "chips" => ShellCommand::Chips,
        "next" | "n" => ShellCommand::Next,
        "prev" | "p" => ShellCommand::Prev,
        "page" => {
            let page: u32 = number(rest.first(), "page")?;
            ShellCommand::Page(page.saturating_sub(1))
        }
        "limit" => ShellCommand::Limit(number(rest.first(), "limit")?),
        "view" => ShellCommand::View(joined.parse()?),
        "density" => ShellCommand::Density(joined.parse()?),
        "column" => ShellCommand::Column(rest.first().ok_or("usage: column <key>")?.clone()),
        "refs" => ShellCommand::Refs,
        "create" => {
            let pairs = rest
                .iter()
                .map(|w| {
                    w.split_once('=')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| format!("expected key=value, got '{w}'"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            ShellCommand::Create(pairs)
        }
        "delete" | "del" => ShellCommand::Delete(number(rest.first(), "event id")?),
        "undo" | "u" => ShellCommand::Undo,
        "action" => ShellCommand::Action(number(rest.first(), "toast id")?),
        "dismiss" => ShellCommand::Dismiss(number(rest.first(), "toast id")?),
        "toasts" => ShellCommand::Toasts,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

/// Build the create form from `key=value` pairs.
pub fn form_from_pairs(pairs: &[(String, String)]) -> Result<EventForm, String> {
    let mut form = EventForm::default();
    for (key, value) in pairs {
        let value = value.clone();
        match key.as_str() {
            "title" => form.title = value,
            "description" | "desc" => form.description = value,
            "type" | "event_type" => form.event_type = value,
            "severity" => form.severity = value,
            "source" => form.source = value,
            "time" | "timestamp" => form.timestamp = value,
            "agents" | "agent" => form.agent_ids = split_list(&value),
            "tool" => form.tool_id = value,
            "from" | "version_from" => form.version_from = value,
            "to" | "version_to" => form.version_to = value,
            "tags" | "tag" => form.tag_ids = split_list(&value),
            "metadata" => form.metadata = value,
            other => return Err(format!("unknown field '{other}'")),
        }
    }
    Ok(form)
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Next {
    Continue,
    /// Ask this question, then call [`Shell::answer`] with the reply.
    Confirm(String),
    Quit,
}

pub struct Shell<A, S> {
    controller: EventsController<A, S>,
    toasts_seen: i64,
}

impl<A: LedgerApi, S: KeyValueStore> Shell<A, S> {
    pub fn new(controller: EventsController<A, S>) -> Self {
        Self {
            controller,
            toasts_seen: 0,
        }
    }

    fn page(&self) -> String {
        let c = &self.controller;
        let mut out = render::chips(&c.chips());
        out.push_str(&render::events(c.events(), c.view(), c.refs(), c.error()));
        out.push_str(&render::pagination(c.filters(), c.events().len(), c.has_prev(), c.has_next()));
        out
    }

    /// Toasts are listed once when they appear; `toasts` lists all of them.
    fn new_toasts(&mut self) -> String {
        let queue = self.controller.toasts();
        let latest = queue.iter().map(|t| t.id).max().unwrap_or(0);
        let fresh = render::toasts(queue.iter().filter(|t| t.id > self.toasts_seen));
        self.toasts_seen = self.toasts_seen.max(latest);
        fresh
    }

    pub async fn execute(&mut self, command: ShellCommand) -> (Next, String) {
        let c = &mut self.controller;
        let mut out = match command {
            ShellCommand::Help => HELP.to_string() + "\n",
            ShellCommand::Quit => return (Next::Quit, String::new()),
            ShellCommand::Refresh => {
                c.load().await;
                self.page()
            }
            ShellCommand::Search(text) => {
                c.set_search(text).await;
                self.page()
            }
            ShellCommand::Filter(key, value) => {
                c.set_filter(key, value).await;
                self.page()
            }
            ShellCommand::Unfilter(key) => {
                c.remove_chip(key).await;
                self.page()
            }
            ShellCommand::Clear => {
                c.clear_filters().await;
                self.page()
            }
            ShellCommand::Chips => render::chips(&c.chips()),
            ShellCommand::Next => {
                if c.next_page().await {
                    self.page()
                } else {
                    "Already on the last page.\n".to_string()
                }
            }
            ShellCommand::Prev => {
                if c.prev_page().await {
                    self.page()
                } else {
                    "Already on the first page.\n".to_string()
                }
            }
            ShellCommand::Page(page) => {
                c.set_page(page).await;
                self.page()
            }
            ShellCommand::Limit(limit) => match c.set_limit(limit).await {
                Ok(()) => self.page(),
                Err(e) => format!("{e}\n"),
            },
            ShellCommand::View(mode) => {
                c.view_mut().mode = mode;
                self.page()
            }
            ShellCommand::Density(density) => {
                c.view_mut().density = density;
                self.page()
            }
            ShellCommand::Column(key) => match c.view_mut().toggle_column(&key) {
                Some(_) => self.page(),
                None => format!("Unknown column '{key}'.\n"),
            },
            ShellCommand::Refs => {
                c.load_reference().await;
                let refs = c.refs();
                let mut out = String::new();
                for (label, names) in [
                    ("Agents", refs.agents.iter().map(|(id, a)| format!("#{id} {}", a.name)).collect::<Vec<_>>()),
                    ("Tools", refs.tools.iter().map(|(id, t)| format!("#{id} {}", t.name)).collect()),
                    ("Tags", refs.tags.iter().map(|(id, t)| format!("#{id} {}", t.name)).collect()),
                ] {
                    let _ = writeln!(out, "{label}: {}", if names.is_empty() { "-".to_string() } else { names.join(", ") });
                }
                out
            }
            ShellCommand::Create(pairs) => match form_from_pairs(&pairs) {
                Err(e) => format!("{e}\n"),
                Ok(form) => match c.create(&form).await {
                    Err(e) => format!("Not created: {e}\n"),
                    Ok(_) => self.page(),
                },
            },
            ShellCommand::Delete(id) => {
                let question = c
                    .request_delete(id)
                    .await
                    .map(|item| format!("Delete event #{} \"{}\"?", item.id, item.title));
                return match question {
                    Some(question) => (Next::Confirm(question), String::new()),
                    None => (Next::Continue, self.new_toasts()),
                };
            }
            ShellCommand::Undo => {
                if c.undo(None).await {
                    self.page()
                } else {
                    "Nothing to undo.\n".to_string()
                }
            }
            ShellCommand::Action(toast_id) => {
                let has_action = c.toasts().find(toast_id).is_some_and(|t| t.action.is_some());
                if !has_action {
                    "That toast has no action.\n".to_string()
                } else if c.invoke_toast_action(toast_id).await {
                    self.page()
                } else {
                    "Nothing to undo.\n".to_string()
                }
            }
            ShellCommand::Dismiss(toast_id) => {
                c.dismiss_toast(toast_id);
                String::new()
            }
            ShellCommand::Toasts => {
                let all = render::toasts(c.toasts().iter());
                self.new_toasts();
                if all.is_empty() { "No notifications.\n".to_string() } else { all }
            }
        };
        out.push_str(&self.new_toasts());
        (Next::Continue, out)
    }

    /// Reply to a pending delete confirmation.
    pub async fn answer(&mut self, reply: &str) -> String {
        if !is_yes(reply) {
            self.controller.decline_delete();
            return "Cancelled.\n".to_string();
        }
        self.controller.confirm_delete().await;
        let mut out = self.page();
        out.push_str(&self.new_toasts());
        out
    }
}

pub async fn run(api_url: &str, token: Option<&str>) -> i32 {
    let mut shell = Shell::new(open_controller(api_url, token));
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    shell.controller.mount().await;
    let intro = format!("{}Type 'help' for commands.\n", shell.page());
    let _ = stdout.write_all(intro.as_bytes()).await;

    loop {
        let _ = stdout.write_all(b"ledger> ").await;
        let _ = stdout.flush().await;
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                return 3;
            }
        };
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                let _ = stdout.write_all(format!("{e}\n").as_bytes()).await;
                continue;
            }
        };
        let (next, output) = shell.execute(command).await;
        let _ = stdout.write_all(output.as_bytes()).await;
        match next {
            Next::Continue => {}
            Next::Quit => break,
            Next::Confirm(question) => {
                let _ = stdout.write_all(format!("{question} [y/N] ").as_bytes()).await;
                let _ = stdout.flush().await;
                let reply = lines.next_line().await.ok().flatten().unwrap_or_default();
                let output = shell.answer(&reply).await;
                let _ = stdout.write_all(output.as_bytes()).await;
            }
        }
    }
    0
}
