use crate::error::AppError;
use crate::event::ItemEvent;
use crate::model::{Item, NewItem, SortOrder};
use crate::state::{Draft, ItemState, ReadFailure};
use time::OffsetDateTime;

/// A single store call requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Insert(NewItem),
    Update(Item),
    Delete(Item),
    DeleteById(i64),
    /// Replace the list subscription. Emissions from older generations are
    /// dropped.
    Subscribe {
        order: SortOrder,
        generation: u64,
    },
}

/// Results flowing back from the store side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// A list read by the subscription of `generation`, taken at store
    /// `version`.
    Snapshot {
        generation: u64,
        version: u64,
        result: Result<Vec<Item>, AppError>,
    },
    Inserted {
        version: u64,
        result: Result<i64, AppError>,
    },
    Written {
        version: u64,
        result: Result<(), AppError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Event(ItemEvent),
    Feedback(Feedback),
}

impl From<ItemEvent> for Action {
    fn from(event: ItemEvent) -> Self {
        Self::Event(event)
    }
}

impl From<Feedback> for Action {
    fn from(feedback: Feedback) -> Self {
        Self::Feedback(feedback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ItemState,
    pub effect: Option<Effect>,
}

/// `today` is the creation date stamped on a saved draft.
pub fn reduce(state: &ItemState, action: Action, today: OffsetDateTime) -> Transition {
    let mut next = state.clone();
    let effect = match action {
        Action::Event(event) => apply_event(&mut next, event, today),
        Action::Feedback(feedback) => {
            apply_feedback(&mut next, feedback);
            None
        }
    };

    Transition {
        state: next,
        effect,
    }
}

fn apply_event(state: &mut ItemState, event: ItemEvent, today: OffsetDateTime) -> Option<Effect> {
    match event {
        ItemEvent::SetTitle(title) => {
            state.draft.title = title;
            None
        }
        ItemEvent::SetDescription(description) => {
            state.draft.description = description;
            None
        }
        ItemEvent::SetDueDate(due_date) => {
            state.draft.due_date = Some(due_date);
            None
        }
        ItemEvent::ShowDialog => {
            state.is_adding_item = true;
            None
        }
        ItemEvent::HideDialog => {
            reset_draft(state);
            None
        }
        ItemEvent::SaveItem => {
            if state.saving {
                return None;
            }
            state.saving = true;
            let item = state.draft.to_new_item(today);
            Some(begin_write(state, Effect::Insert(item)))
        }
        ItemEvent::UpdateItem(item) => Some(begin_write(state, Effect::Update(item))),
        ItemEvent::DeleteItem(item) => Some(begin_write(state, Effect::Delete(item))),
        ItemEvent::DeleteItemById(id) => Some(begin_write(state, Effect::DeleteById(id))),
        ItemEvent::SortItems(order) => {
            state.sort_order = order;
            state.generation += 1;
            Some(Effect::Subscribe {
                order,
                generation: state.generation,
            })
        }
    }
}

fn begin_write(state: &mut ItemState, effect: Effect) -> Effect {
    state.pending_writes += 1;
    state.error = None;
    effect
}

fn apply_feedback(state: &mut ItemState, feedback: Feedback) {
    match feedback {
        Feedback::Snapshot {
            generation,
            version,
            result,
        } => {
            if generation != state.generation {
                return;
            }
            match result {
                Ok(items) => {
                    state.items = items;
                    state.items_generation = generation;
                    state.synced_version = state.synced_version.max(version);
                    state.failed_read = None;
                }
                Err(err) => {
                    state.failed_read = Some(ReadFailure {
                        generation,
                        version,
                    });
                    state.error = Some(err);
                }
            }
        }
        Feedback::Inserted { version, result } => {
            finish_write(state, version);
            state.saving = false;
            match result {
                Ok(id) => {
                    state.last_inserted_id = Some(id);
                    reset_draft(state);
                }
                Err(err) => state.error = Some(err),
            }
        }
        Feedback::Written { version, result } => {
            finish_write(state, version);
            if let Err(err) = result {
                state.error = Some(err);
            }
        }
    }
}

fn finish_write(state: &mut ItemState, version: u64) {
    state.pending_writes = state.pending_writes.saturating_sub(1);
    state.required_version = state.required_version.max(version);
}

fn reset_draft(state: &mut ItemState) {
    state.draft = Draft::default();
    state.is_adding_item = false;
}
