use clap::{CommandFactory, Parser};
use time::UtcOffset;
use todolist_cli::cli::{Cli, Command, collect_config_overrides};
use todolist_cli::render;
use todolist_core::config::{
    Config, ConfigOverrides, Palette, load_config_with_fallback, merge_overrides,
};
use todolist_core::dates::{local_offset, parse_due_date};
use todolist_core::error::AppError;
use todolist_core::event::ItemEvent;
use todolist_core::model::{Item, SortOrder};
use todolist_core::state::ItemState;
use todolist_core::storage::ItemStore;
use todolist_core::view_model::ItemViewModel;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn init_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(config.log_level()))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }
    Ok(())
}

/// The last write's outcome, once the list has caught up with it.
fn write_outcome(state: ItemState) -> Result<ItemState, AppError> {
    match state.error {
        Some(err) => Err(err),
        None => Ok(state),
    }
}

struct Session {
    store: ItemStore,
    view_model: ItemViewModel,
    palette: Palette,
    offset: UtcOffset,
}

impl Session {
    async fn open(
        config: &Config,
        overrides: &ConfigOverrides,
        offset: UtcOffset,
    ) -> Result<Self, AppError> {
        let path = config.resolve_database_path(overrides)?;
        info!(path = %path.display(), "opening item store");
        let store = ItemStore::open_path(&path).await?;
        store.health_check().await?;

        let view_model = ItemViewModel::spawn(store.clone(), config.sort_order(), offset);
        Ok(Self {
            store,
            view_model,
            palette: config.palette(),
            offset,
        })
    }

    async fn close(self) {
        self.view_model.shutdown().await;
        self.store.close().await;
        debug!("item store closed");
    }

    async fn fetch_item(&self, id: i64) -> Result<Item, AppError> {
        let mut detail = self.view_model.item_detail(id);
        match detail.next().await {
            Some(Ok(snapshot)) => snapshot.value.ok_or(AppError::RecordNotFound(id)),
            Some(Err(err)) => Err(err),
            None => Err(AppError::RecordNotFound(id)),
        }
    }

    async fn composing(&self) -> Result<ItemState, AppError> {
        let state = self.view_model.settled().await?;
        if !state.is_adding_item {
            return Err(AppError::invalid_input(
                "no item is being composed, run `new` first",
            ));
        }
        Ok(state)
    }

    fn print_items(&self, items: &[Item], json: bool) -> Result<(), AppError> {
        if json {
            render::print_items_json(items)
        } else {
            render::print_items_plain(items, &self.palette, self.offset)
        }
    }

    async fn save_draft(&self, json: bool) -> Result<(), AppError> {
        self.view_model.send(ItemEvent::SaveItem)?;
        let state = write_outcome(self.view_model.settled().await?)?;
        let id = state
            .last_inserted_id
            .ok_or_else(|| AppError::invalid_data("saved item has no id"))?;
        let item = match state.items.iter().find(|item| item.id == id) {
            Some(item) => item.clone(),
            None => self.fetch_item(id).await?,
        };

        if json {
            render::print_item_json(&item)?;
        } else {
            println!(
                "Added item: {} ({})",
                self.palette.accentize(&item.title),
                item.id
            );
        }
        Ok(())
    }

    async fn list(&self, order: Option<SortOrder>, json: bool) -> Result<(), AppError> {
        if let Some(order) = order {
            self.view_model.send(ItemEvent::SortItems(order))?;
        }
        let state = self.view_model.settled().await?;
        self.print_items(&state.items, json)
    }

    async fn run_command(&self, command: Command, json: bool) -> Result<(), AppError> {
        match command {
            Command::Add {
                title,
                description,
                due,
            } => {
                let title = title.unwrap_or_default();
                require_title(&title)?;
                let due_date = due
                    .as_deref()
                    .map(|raw| parse_due_date(raw, self.offset))
                    .transpose()?;

                self.view_model.send(ItemEvent::HideDialog)?;
                self.view_model.send(ItemEvent::ShowDialog)?;
                self.view_model.send(ItemEvent::SetTitle(title))?;
                self.view_model
                    .send(ItemEvent::SetDescription(description.unwrap_or_default()))?;
                if let Some(due_date) = due_date {
                    self.view_model.send(ItemEvent::SetDueDate(due_date))?;
                }
                self.save_draft(json).await?;
            }
            Command::List { sort } => self.list(sort, json).await?,
            Command::Sort { order } => self.list(Some(order), json).await?,
            Command::Show { id } => {
                let item = self.fetch_item(id).await?;
                if json {
                    render::print_item_json(&item)?;
                } else {
                    render::print_item_detail(&item, &self.palette, self.offset)?;
                }
            }
            Command::Edit {
                id,
                title,
                description,
                due,
                clear_due,
            } => {
                if title.is_none() && description.is_none() && due.is_none() && !clear_due {
                    return Err(AppError::invalid_input(
                        "nothing to change, pass --title, --description, --due or --clear-due",
                    ));
                }
                if let Some(title) = title.as_deref() {
                    require_title(title)?;
                }
                let due_date = due
                    .as_deref()
                    .map(|raw| parse_due_date(raw, self.offset))
                    .transpose()?;

                let mut item = self.fetch_item(id).await?;
                if let Some(title) = title {
                    item.title = title;
                }
                if let Some(description) = description {
                    item.description = description;
                }
                if due_date.is_some() || clear_due {
                    item.due_date = due_date;
                }

                self.view_model.send(ItemEvent::UpdateItem(item))?;
                write_outcome(self.view_model.settled().await?)?;
                let updated = self.fetch_item(id).await?;
                if json {
                    render::print_item_json(&updated)?;
                } else {
                    println!("Updated item: {} ({})", updated.title, updated.id);
                }
            }
            Command::Delete { id } => {
                let item = self.fetch_item(id).await?;
                self.view_model.send(ItemEvent::DeleteItem(item.clone()))?;
                write_outcome(self.view_model.settled().await?)?;
                if json {
                    render::print_item_json(&item)?;
                } else {
                    println!("Deleted item: {} ({})", item.title, item.id);
                }
            }
            Command::New => {
                self.view_model.send(ItemEvent::ShowDialog)?;
                let state = self.view_model.settled().await?;
                render::print_draft(&state.draft, json, self.offset)?;
            }
            Command::SetTitle { title } => {
                self.composing().await?;
                self.view_model.send(ItemEvent::SetTitle(title))?;
            }
            Command::SetDescription { description } => {
                self.composing().await?;
                self.view_model.send(ItemEvent::SetDescription(description))?;
            }
            Command::SetDue { datetime } => {
                let due_date = parse_due_date(&datetime, self.offset)?;
                self.composing().await?;
                self.view_model.send(ItemEvent::SetDueDate(due_date))?;
            }
            Command::Draft => {
                let state = self.composing().await?;
                render::print_draft(&state.draft, json, self.offset)?;
            }
            Command::Save => {
                let state = self.composing().await?;
                require_title(&state.draft.title)?;
                self.save_draft(json).await?;
            }
            Command::Cancel => {
                self.composing().await?;
                self.view_model.send(ItemEvent::HideDialog)?;
                println!("{}", self.palette.mutedize("Draft discarded."));
            }
        }

        Ok(())
    }

    async fn run_interactive(&self) -> Result<(), AppError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(input) = lines
            .next_line()
            .await
            .map_err(|err| AppError::io(err.to_string()))?
        {
            let line = input.trim();
            if line.is_empty() {
                continue;
            }

            if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                break;
            }

            if line == "help" || line == "?" {
                print_help();
                continue;
            }

            let args = match split_command_line(line) {
                Ok(args) => args,
                Err(err) => {
                    eprintln!("ERROR: {}", err);
                    continue;
                }
            };

            if args.is_empty() {
                continue;
            }

            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push("todolist".to_string());
            argv.extend(args);

            let cli = match Cli::try_parse_from(argv) {
                Ok(cli) => cli,
                Err(err) if !err.use_stderr() => {
                    println!("{err}");
                    continue;
                }
                Err(err) => {
                    eprintln!("ERROR: {}", normalize_parse_error(err));
                    continue;
                }
            };

            if !cli.config_override.is_empty() {
                eprintln!(
                    "ERROR: {}",
                    AppError::invalid_input("config overrides are only accepted at startup")
                );
                continue;
            }

            if let Err(err) = self.run_command(cli.command, cli.json).await {
                if err.is_fatal() {
                    return Err(err);
                }
                eprintln!("ERROR: {}", err);
            }
        }

        Ok(())
    }
}

fn load_config(raw_overrides: &[String]) -> Result<(Config, ConfigOverrides), AppError> {
    let overrides = collect_config_overrides(raw_overrides)?;
    let loaded = load_config_with_fallback();
    let config = merge_overrides(&loaded.config, &overrides);
    init_logging(&config);
    if let Some(err) = loaded.error {
        warn!(error = %err, "config could not be read, using defaults");
    }
    Ok((config, overrides))
}

fn run(cli: Option<Cli>, offset: UtcOffset) -> Result<(), AppError> {
    let raw_overrides = cli
        .as_ref()
        .map(|cli| cli.config_override.clone())
        .unwrap_or_default();
    let (config, overrides) = load_config(&raw_overrides)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::io(err.to_string()))?;

    let result = runtime.block_on(async move {
        let session = Session::open(&config, &overrides, offset).await?;
        let result = match cli {
            Some(cli) => session.run_command(cli.command, cli.json).await,
            None => session.run_interactive().await,
        };
        session.close().await;
        result
    });
    // A blocking stdin read may still be pending after `exit`.
    runtime.shutdown_background();
    result
}

fn main() {
    // Resolved before the runtime starts any threads.
    let offset = local_offset();

    let mut args = std::env::args_os();
    args.next();
    let cli = if args.next().is_none() {
        None
    } else {
        match Cli::try_parse() {
            Ok(cli) => Some(cli),
            Err(err) if !err.use_stderr() => {
                let _ = err.print();
                return;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                std::process::exit(1);
            }
        }
    };

    if let Err(err) = run(cli, offset) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_parse_error, split_command_line};
    use clap::Parser;
    use todolist_cli::cli::Cli;

    #[test]
    fn split_command_line_keeps_quoted_words_together() {
        let args = split_command_line(r#"add "Buy groceries" -d "Milk \"2%\"""#).unwrap();

        assert_eq!(args, vec!["add", "Buy groceries", "-d", "Milk \"2%\""]);
    }

    #[test]
    fn split_command_line_rejects_unterminated_quote() {
        let err = split_command_line(r#"add "Buy groceries"#).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn parse_errors_become_invalid_input() {
        let err = Cli::try_parse_from(["todolist", "frobnicate"]).unwrap_err();
        let normalized = normalize_parse_error(err);

        assert_eq!(normalized.code(), "invalid_input");
        assert!(!normalized.to_string().contains("error: "));
    }
}
