use clap::{Args, Subcommand};
use ledger_core::chips::ChipKey;
use ledger_core::error::ErrorBody;
use ledger_core::filters::{FilterKey, FilterState};
use ledger_core::form::EventForm;
use ledger_core::toast::ToastKind;
use ledger_core::view::{Density, ViewMode};
use serde_json::json;

use super::{Controller, open_controller};
use crate::render;
use crate::util::{confirm, exit_error, print_error, read_text_from_file};

#[derive(Subcommand)]
pub enum EventCommands {
    /// List events. Flags update the saved filters, which later runs reuse
    List(ListArgs),
    /// Show the saved filters as removable chips
    Filters,
    /// Clear one saved filter (e.g. severity, agent_id, search), or all of them
    Clear {
        /// Filter to clear; omit to clear everything
        key: Option<String>,
    },
    /// Create a new event
    Create(CreateArgs),
    /// Delete an event (can be undone with `ledger events undo`)
    Delete {
        /// Event ID
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Recreate the most recently deleted event
    Undo,
}

#[derive(Args)]
pub struct ListArgs {
    /// Free-text search over title and description
    #[arg(long, short = 's')]
    search: Option<String>,
    /// Filter by agent ID
    #[arg(long)]
    agent: Option<String>,
    /// Filter by tool ID
    #[arg(long)]
    tool: Option<String>,
    /// Filter by tag ID
    #[arg(long)]
    tag: Option<String>,
    /// Filter by event type (e.g. tool_update, outage, rollout)
    #[arg(long)]
    event_type: Option<String>,
    /// Filter by severity (info, warning, critical)
    #[arg(long)]
    severity: Option<String>,
    /// Filter by source (manual, automated, webhook)
    #[arg(long)]
    source: Option<String>,
    /// Only events at or after this local time (e.g. 2025-11-20T08:00)
    #[arg(long)]
    start: Option<String>,
    /// Only events at or before this local time
    #[arg(long)]
    end: Option<String>,
    /// Page number, starting at 1
    #[arg(long)]
    page: Option<u32>,
    /// Events per page
    #[arg(long)]
    limit: Option<u32>,
    /// Forget saved filters before applying these flags
    #[arg(long)]
    reset: bool,
    /// list or timeline
    #[arg(long, default_value = "list")]
    view: ViewMode,
    /// comfortable or compact
    #[arg(long, default_value = "comfortable")]
    density: Density,
    /// Toggle a column (repeatable: timestamp, severity, type, title, source, agents, tools, tags)
    #[arg(long = "column")]
    columns: Vec<String>,
    /// Print the raw events as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Short title
    #[arg(long)]
    title: String,
    /// Longer description
    #[arg(long)]
    description: Option<String>,
    /// Event type (tool_install, tool_update, tool_removal, outage, patch, rollout, config_change)
    #[arg(long)]
    event_type: String,
    /// info, warning or critical (default info)
    #[arg(long)]
    severity: Option<String>,
    /// manual, automated or webhook (default manual)
    #[arg(long)]
    source: Option<String>,
    /// When it happened, local time (default now)
    #[arg(long)]
    timestamp: Option<String>,
    /// Agent IDs (repeatable or comma-separated)
    #[arg(long = "agent", value_delimiter = ',')]
    agents: Vec<String>,
    /// Tool ID
    #[arg(long)]
    tool: Option<String>,
    /// Tool version before the change
    #[arg(long, requires = "tool")]
    version_from: Option<String>,
    /// Tool version after the change
    #[arg(long, requires = "tool")]
    version_to: Option<String>,
    /// Tag IDs (repeatable or comma-separated)
    #[arg(long = "tag", value_delimiter = ',')]
    tags: Vec<String>,
    /// Metadata as a JSON object string
    #[arg(long)]
    metadata: Option<String>,
    /// Read metadata from file (use '-' for stdin)
    #[arg(long, conflicts_with = "metadata")]
    metadata_file: Option<String>,
}

pub async fn run(api_url: &str, token: Option<&str>, command: EventCommands) -> i32 {
    let mut controller = open_controller(api_url, token);
    match command {
        EventCommands::List(args) => list(&mut controller, args).await,
        EventCommands::Filters => {
            controller.load_reference().await;
            print!("{}", render::chips(&controller.chips()));
            0
        }
        EventCommands::Clear { key } => clear(&mut controller, key.as_deref()).await,
        EventCommands::Create(args) => create(&mut controller, args).await,
        EventCommands::Delete { id, yes } => delete(&mut controller, id, yes).await,
        EventCommands::Undo => undo(&mut controller).await,
    }
}

fn apply_flags(mut filters: FilterState, args: &ListArgs) -> FilterState {
    let fields = [
        (FilterKey::AgentId, &args.agent),
        (FilterKey::ToolId, &args.tool),
        (FilterKey::TagId, &args.tag),
        (FilterKey::EventType, &args.event_type),
        (FilterKey::Severity, &args.severity),
        (FilterKey::Source, &args.source),
        (FilterKey::Start, &args.start),
        (FilterKey::End, &args.end),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            filters.set(key, v.trim());
        }
    }
    if let Some(limit) = args.limit {
        if filters.set_limit(limit).is_err() {
            exit_error("--limit must be greater than zero", None);
        }
    }
    if let Some(page) = args.page {
        filters.set_page(page.saturating_sub(1));
    }
    filters
}

async fn list(controller: &mut Controller, args: ListArgs) -> i32 {
    let base = if args.reset {
        FilterState::default()
    } else {
        controller.filters().clone()
    };
    let search = match (&args.search, args.reset) {
        (Some(s), _) => s.trim().to_string(),
        (None, true) => String::new(),
        (None, false) => controller.search().to_string(),
    };
    let filters = apply_flags(base, &args);
    controller.replace_state(filters, search);

    {
        let view = controller.view_mut();
        view.mode = args.view;
        view.density = args.density;
        for key in &args.columns {
            if view.toggle_column(key).is_none() {
                exit_error(
                    &format!("Unknown column '{key}'"),
                    Some("Columns: timestamp, severity, type, title, source, agents, tools, tags"),
                );
            }
        }
    }

    controller.mount().await;

    if args.json {
        let output = json!({
            "events": controller.events(),
            "filters": controller.filters(),
            "search": controller.search(),
            "error": controller.error(),
            "undo_available": controller.undo_payload().map(|p| p.title.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        print!("{}", render::chips(&controller.chips()));
        print!(
            "{}",
            render::events(controller.events(), controller.view(), controller.refs(), controller.error())
        );
        print!(
            "{}",
            render::pagination(
                controller.filters(),
                controller.events().len(),
                controller.has_prev(),
                controller.has_next()
            )
        );
    }

    if controller.error().is_some() { 2 } else { 0 }
}

async fn clear(controller: &mut Controller, key: Option<&str>) -> i32 {
    match key {
        None => {
            let limit = controller.filters().limit;
            let filters = FilterState {
                limit,
                ..FilterState::default()
            };
            controller.replace_state(filters, String::new());
        }
        Some(raw) => {
            let chip: ChipKey = match raw.parse() {
                Ok(k) => k,
                Err(e) => exit_error(
                    &e.to_string(),
                    Some("Use one of: search, agent_id, tool_id, tag_id, event_type, severity, source, start, end"),
                ),
            };
            let mut filters = controller.filters().clone();
            let mut search = controller.search().to_string();
            ledger_core::chips::remove_chip(chip, &mut search, &mut filters);
            controller.replace_state(filters, search);
        }
    }
    controller.load_reference().await;
    print!("{}", render::chips(&controller.chips()));
    0
}

async fn create(controller: &mut Controller, args: CreateArgs) -> i32 {
    let metadata = match (args.metadata, args.metadata_file) {
        (Some(m), _) => m,
        (None, Some(path)) => match read_text_from_file(&path) {
            Ok(text) => text,
            Err(e) => exit_error(&e, Some("Provide a JSON object file or use '-' for stdin")),
        },
        (None, None) => String::new(),
    };
    let form = EventForm {
        title: args.title,
        description: args.description.unwrap_or_default(),
        event_type: args.event_type,
        severity: args.severity.unwrap_or_default(),
        source: args.source.unwrap_or_default(),
        timestamp: args.timestamp.unwrap_or_default(),
        agent_ids: args.agents,
        tool_id: args.tool.unwrap_or_default(),
        version_from: args.version_from.unwrap_or_default(),
        version_to: args.version_to.unwrap_or_default(),
        tag_ids: args.tags,
        metadata,
    };

    match controller.create(&form).await {
        Err(e) => {
            print_error(&ErrorBody::from(&e));
            1
        }
        Ok(Some(created)) => {
            println!("{}", serde_json::to_string_pretty(&created).unwrap_or_default());
            0
        }
        Ok(None) => {
            eprint!("{}", render::toasts(controller.toasts().iter()));
            2
        }
    }
}

async fn delete(controller: &mut Controller, id: i64, yes: bool) -> i32 {
    let prompt = match controller.request_delete(id).await {
        Some(item) => format!("Delete event #{} \"{}\"?", item.id, item.title),
        None => {
            eprint!("{}", render::toasts(controller.toasts().iter()));
            return 1;
        }
    };
    if !yes && !confirm(&prompt) {
        controller.decline_delete();
        eprintln!("Cancelled.");
        return 0;
    }
    let deleted = controller.confirm_delete().await;
    print!("{}", render::toasts(controller.toasts().iter()));
    if deleted {
        println!("Run `ledger events undo` to restore it.");
        0
    } else {
        2
    }
}

async fn undo(controller: &mut Controller) -> i32 {
    if !controller.undo(None).await {
        print_error(
            &ErrorBody::new(ledger_core::error::codes::CLI_ERROR, "Nothing to undo")
                .with_hint("Only the most recent delete can be undone"),
        );
        return 1;
    }
    print!("{}", render::toasts(controller.toasts().iter()));
    let failed = controller
        .toasts()
        .iter()
        .any(|t| t.kind == ToastKind::Error);
    if failed { 2 } else { 0 }
}
