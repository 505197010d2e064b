use crate::dates::today_at_midnight;
use crate::error::AppError;
use crate::event::ItemEvent;
use crate::model::SortOrder;
use crate::reducer::{Action, Effect, Feedback, Transition, reduce};
use crate::state::ItemState;
use crate::storage::{ItemStore, ItemSubscription};
use time::UtcOffset;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

enum Command {
    Event(ItemEvent),
    /// Answered once every command queued before it has been reduced.
    Flush(oneshot::Sender<()>),
}

/// Owns the application state on a single task. Events are reduced in the
/// order they are sent; store writes run one at a time on a writer task.
pub struct ItemViewModel {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ItemState>,
    store: ItemStore,
    task: JoinHandle<()>,
}

impl ItemViewModel {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: ItemStore, initial_order: SortOrder, offset: UtcOffset) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ItemState::with_sort_order(initial_order));
        let (feedback, feedback_rx) = mpsc::unbounded_channel();
        let (writes, writes_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(run_writer(store.clone(), writes_rx, feedback.clone()));
        let actor = Actor {
            store: store.clone(),
            state: state_tx,
            offset,
            writes,
            writer,
            feedback,
            subscription: None,
        };
        let task = tokio::spawn(actor.run(commands_rx, feedback_rx, initial_order));

        Self {
            commands,
            state,
            store,
            task,
        }
    }

    pub fn send(&self, event: ItemEvent) -> Result<(), AppError> {
        self.commands
            .send(Command::Event(event))
            .map_err(|_| stopped())
    }

    pub fn subscribe(&self) -> watch::Receiver<ItemState> {
        self.state.clone()
    }

    pub fn state(&self) -> ItemState {
        self.state.borrow().clone()
    }

    /// Waits until every event sent so far is reduced, its writes completed
    /// and the list caught up with them. Unavailable storage and a failed
    /// list read are returned as errors since the list would not catch up.
    pub async fn settled(&self) -> Result<ItemState, AppError> {
        let (done, flushed) = oneshot::channel();
        self.commands
            .send(Command::Flush(done))
            .map_err(|_| stopped())?;
        flushed.await.map_err(|_| stopped())?;

        let mut state = self.state.clone();
        let guard = state
            .wait_for(|state| {
                state.is_settled() || state.fatal_error().is_some() || state.read_error().is_some()
            })
            .await
            .map_err(|_| stopped())?;
        let settled = (*guard).clone();
        drop(guard);

        match settled.fatal_error().or(settled.read_error()) {
            Some(err) => Err(err.clone()),
            None => Ok(settled),
        }
    }

    /// Live view of a single item, for detail and edit screens.
    pub fn item_detail(&self, id: i64) -> ItemSubscription {
        self.store.query_by_id(id)
    }

    /// Stops the actor after draining queued events and writes.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.task.await {
            error!(error = %err, "item view model task failed");
        }
    }
}

fn stopped() -> AppError {
    AppError::io("item view model has stopped")
}

struct Actor {
    store: ItemStore,
    state: watch::Sender<ItemState>,
    offset: UtcOffset,
    writes: mpsc::UnboundedSender<Effect>,
    writer: JoinHandle<()>,
    feedback: mpsc::UnboundedSender<Feedback>,
    subscription: Option<JoinHandle<()>>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut feedback: mpsc::UnboundedReceiver<Feedback>,
        initial_order: SortOrder,
    ) {
        self.dispatch(ItemEvent::SortItems(initial_order).into());

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Event(event)) => self.dispatch(event.into()),
                    Some(Command::Flush(done)) => {
                        let _ = done.send(());
                    }
                    None => break,
                },
                Some(result) = feedback.recv() => self.dispatch(result.into()),
            }
        }

        if let Some(subscription) = self.subscription.take() {
            subscription.abort();
        }
        drop(self.writes);
        if let Err(err) = self.writer.await {
            error!(error = %err, "item writer task failed");
        }
        debug!("item view model stopped");
    }

    fn dispatch(&mut self, action: Action) {
        if let Action::Feedback(feedback) = &action {
            self.log_feedback(feedback);
        }

        let today = today_at_midnight(self.offset);
        let Transition { state, effect } = {
            let current = self.state.borrow();
            reduce(&current, action, today)
        };
        self.state.send_replace(state);

        if let Some(effect) = effect {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Subscribe { order, generation } => self.resubscribe(order, generation),
            write => {
                debug!(?write, "queueing store write");
                if self.writes.send(write).is_err() {
                    error!("item writer stopped, write dropped");
                }
            }
        }
    }

    fn resubscribe(&mut self, order: SortOrder, generation: u64) {
        if let Some(previous) = self.subscription.take() {
            previous.abort();
        }

        info!(%order, generation, "subscribing to item list");
        let mut subscription = self.store.query_all(order);
        let feedback = self.feedback.clone();
        self.subscription = Some(tokio::spawn(async move {
            while let Some(result) = subscription.next().await {
                let snapshot = Feedback::Snapshot {
                    generation,
                    version: subscription.version(),
                    result: result.map(|snapshot| snapshot.value),
                };
                if feedback.send(snapshot).is_err() {
                    break;
                }
            }
        }));
    }

    fn log_feedback(&self, feedback: &Feedback) {
        match feedback {
            Feedback::Snapshot {
                generation, result, ..
            } => {
                let current = self.state.borrow().generation;
                if *generation != current {
                    debug!(generation, current, "dropping stale item list");
                } else if let Err(err) = result {
                    error!(error = %err, "item list query failed");
                }
            }
            Feedback::Inserted { result, .. } => match result {
                Ok(id) => info!(id, "item saved"),
                Err(err) => warn!(error = %err, "saving item failed, draft kept"),
            },
            Feedback::Written { result, .. } => match result {
                Ok(()) => {}
                Err(AppError::RecordNotFound(id)) => {
                    warn!(id, "item no longer exists, write skipped")
                }
                Err(err) => warn!(error = %err, "item write failed"),
            },
        }
    }
}

async fn run_writer(
    store: ItemStore,
    mut writes: mpsc::UnboundedReceiver<Effect>,
    feedback: mpsc::UnboundedSender<Feedback>,
) {
    while let Some(effect) = writes.recv().await {
        let outcome = match effect {
            Effect::Insert(item) => {
                let result = store.insert(&item).await;
                Feedback::Inserted {
                    version: store.version(),
                    result,
                }
            }
            Effect::Update(item) => {
                let result = store.update(&item).await;
                Feedback::Written {
                    version: store.version(),
                    result,
                }
            }
            Effect::Delete(item) => {
                let result = store.delete_item(&item).await;
                Feedback::Written {
                    version: store.version(),
                    result,
                }
            }
            Effect::DeleteById(id) => {
                let result = store.delete_by_id(id).await;
                Feedback::Written {
                    version: store.version(),
                    result,
                }
            }
            Effect::Subscribe { .. } => continue,
        };

        // The actor may already be gone during shutdown; the write itself
        // has completed either way.
        let _ = feedback.send(outcome);
    }
}
