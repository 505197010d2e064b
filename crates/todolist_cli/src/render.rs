use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::{OffsetDateTime, UtcOffset};
use todolist_core::config::Palette;
use todolist_core::dates::{format_date, format_date_time};
use todolist_core::error::AppError;
use todolist_core::model::Item;
use todolist_core::state::Draft;

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Created")]
    created: String,
}

fn due_label(due_date: Option<OffsetDateTime>, offset: UtcOffset) -> Result<String, AppError> {
    match due_date {
        Some(value) => format_date_time(value, offset),
        None => Ok("-".to_string()),
    }
}

fn created_label(created_on: Option<OffsetDateTime>, offset: UtcOffset) -> Result<String, AppError> {
    match created_on {
        Some(value) => format_date(value, offset),
        None => Ok("-".to_string()),
    }
}

pub fn items_table(items: &[Item], offset: UtcOffset) -> Result<String, AppError> {
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        rows.push(ItemRow {
            id: item.id,
            title: item.title.clone(),
            due: due_label(item.due_date, offset)?,
            created: created_label(item.created_on, offset)?,
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::psql());
    Ok(table.to_string())
}

pub fn print_items_plain(
    items: &[Item],
    palette: &Palette,
    offset: UtcOffset,
) -> Result<(), AppError> {
    if items.is_empty() {
        println!("{}", palette.mutedize("No items."));
        return Ok(());
    }

    println!("{}", items_table(items, offset)?);
    Ok(())
}

pub fn print_items_json(items: &[Item]) -> Result<(), AppError> {
    let json =
        serde_json::to_string(items).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

pub fn print_item_json(item: &Item) -> Result<(), AppError> {
    let json =
        serde_json::to_string(item).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

pub fn item_detail(item: &Item, offset: UtcOffset) -> Result<String, AppError> {
    let description = if item.description.is_empty() {
        "No description"
    } else {
        item.description.as_str()
    };
    let due = match item.due_date {
        Some(value) => format_date_time(value, offset)?,
        None => "Not set".to_string(),
    };
    let created = match item.created_on {
        Some(value) => format_date(value, offset)?,
        None => "Unknown".to_string(),
    };

    Ok(format!(
        "ID: {}\nTitle: {}\nDescription: {}\nDue: {}\nCreated: {}",
        item.id, item.title, description, due, created
    ))
}

pub fn print_item_detail(item: &Item, palette: &Palette, offset: UtcOffset) -> Result<(), AppError> {
    let detail = item_detail(item, offset)?;
    let mut lines = detail.lines();
    if let Some(first) = lines.next() {
        println!("{}", palette.accentize(first));
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

pub fn print_draft(draft: &Draft, json: bool, offset: UtcOffset) -> Result<(), AppError> {
    let due = match draft.due_date {
        Some(value) => Some(format_date_time(value, offset)?),
        None => None,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "title": draft.title,
                "description": draft.description,
                "due_date": due,
            })
        );
    } else {
        println!("Title: {}", draft.title);
        println!("Description: {}", draft.description);
        println!("Due: {}", due.as_deref().unwrap_or("Not set"));
    }
    Ok(())
}
