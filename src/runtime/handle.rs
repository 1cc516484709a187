use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::{
    core::store::{StoreError, assert_type, decode_checked},
    prefs::Prefs,
    record::Record,
    types::ValueType,
    value::PrefType,
};

use super::events::PrefEvent;

/// Errors returned by [`PrefsHandle`] calls.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The store rejected the operation or failed to save.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The command loop has stopped.
    #[error("preference runtime has shut down")]
    ChannelClosed,
}

/// Queue sizes for [`spawn_prefs`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Pending command capacity before senders wait.
    pub command_queue_bound: usize,
    /// Broadcast buffer per subscriber.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

/// Cloneable async handle to a [`Prefs`] owned by one blocking task.
///
/// All mutation and every save happen on that task, one command at a time,
/// so callers on any thread observe each change together with its save.
/// As with [`Prefs`], reading a key with the wrong type panics in the caller.
#[derive(Clone)]
pub struct PrefsHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<PrefEvent>,
}

enum Command {
    Get {
        key: String,
        resp: oneshot::Sender<Option<Record>>,
    },
    Records {
        resp: oneshot::Sender<Vec<Record>>,
    },
    SetRecord {
        key: String,
        value_type: ValueType,
        value: String,
        resp: oneshot::Sender<Result<(), StoreError>>,
    },
    Delete {
        key: String,
        resp: oneshot::Sender<Result<(), StoreError>>,
    },
    AddToSet {
        key: String,
        value: String,
        resp: oneshot::Sender<Result<(), StoreError>>,
    },
    RemoveFromSet {
        key: String,
        value: String,
        resp: oneshot::Sender<Result<(), StoreError>>,
    },
    Save {
        resp: oneshot::Sender<Result<(), StoreError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// Moves `prefs` onto a blocking task and returns a handle to it.
///
/// Must be called from within a Tokio runtime. Dropping every handle stops
/// the task; pending edits are then saved by [`Prefs`]'s drop.
pub fn spawn_prefs(prefs: Prefs, config: RuntimeConfig) -> PrefsHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<PrefEvent>(config.event_capacity);

    let events_tx_loop = events_tx.clone();
    tokio::task::spawn_blocking(move || {
        let mut prefs = prefs;
        while let Some(cmd) = cmd_rx.blocking_recv() {
            if handle_command(cmd, &mut prefs, &events_tx_loop) {
                break;
            }
        }
        debug!("preference runtime stopped");
    });

    PrefsHandle { cmd_tx, events_tx }
}

impl PrefsHandle {
    /// Subscribes to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<PrefEvent> {
        self.events_tx.subscribe()
    }

    /// Record stored under `key`.
    pub async fn get_record(&self, key: impl Into<String>) -> Result<Option<Record>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Get {
            key: key.into(),
            resp: tx,
        })
        .await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Snapshot of every record in display order.
    pub async fn records(&self) -> Result<Vec<Record>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Records { resp: tx }).await?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// True when a record exists for `key`.
    pub async fn has_key(&self, key: impl Into<String>) -> Result<bool, RuntimeError> {
        Ok(self.get_record(key).await?.is_some())
    }

    /// Typed read with default fallback; see [`Prefs::get`].
    pub async fn get<T: PrefType>(&self, key: impl Into<String>, default: T) -> Result<T, RuntimeError> {
        let Some(rec) = self.get_record(key).await? else {
            return Ok(default);
        };
        match assert_type(decode_checked::<T>(&rec)) {
            Ok(Some(value)) => Ok(value),
            _ => Ok(default),
        }
    }

    /// True when the set at `key` contains `value`.
    pub async fn set_contains(&self, key: impl Into<String>, value: &str) -> Result<bool, RuntimeError> {
        let set = self.get::<Vec<String>>(key, Vec::new()).await?;
        Ok(set.iter().any(|e| e == value))
    }

    /// Typed write.
    pub async fn set<T: PrefType>(&self, key: impl Into<String>, value: T) -> Result<(), RuntimeError> {
        if let Some(elem) = value.invalid_element() {
            return Err(StoreError::InvalidSetElement(elem.to_owned()).into());
        }
        self.set_record(key, T::VALUE_TYPE, value.encode()).await
    }

    /// Writes already-encoded parts; see [`Prefs::set_record`].
    pub async fn set_record(
        &self,
        key: impl Into<String>,
        value_type: ValueType,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SetRecord {
            key: key.into(),
            value_type,
            value: value.into(),
            resp: tx,
        })
        .await?;
        Self::settle(rx).await
    }

    /// Removes the record for `key`, if any.
    pub async fn delete_key(&self, key: impl Into<String>) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Delete {
            key: key.into(),
            resp: tx,
        })
        .await?;
        Self::settle(rx).await
    }

    /// Adds `value` to the set at `key`, creating the set if needed.
    pub async fn add_to_set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::AddToSet {
            key: key.into(),
            value: value.into(),
            resp: tx,
        })
        .await?;
        Self::settle(rx).await
    }

    /// Removes `value` from the set at `key`.
    pub async fn remove_from_set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::RemoveFromSet {
            key: key.into(),
            value: value.into(),
            resp: tx,
        })
        .await?;
        Self::settle(rx).await
    }

    /// Forces a save of the current state.
    pub async fn save(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Save { resp: tx }).await?;
        Self::settle(rx).await
    }

    /// Saves pending edits and stops the command loop.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown { resp: tx }).await?;
        Self::settle(rx).await
    }

    async fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }

    async fn settle(rx: oneshot::Receiver<Result<(), StoreError>>) -> Result<(), RuntimeError> {
        let res = rx.await.map_err(|_| RuntimeError::ChannelClosed)?;
        assert_type(res).map_err(RuntimeError::from)
    }
}

fn handle_command(
    cmd: Command,
    prefs: &mut Prefs,
    events_tx: &broadcast::Sender<PrefEvent>,
) -> bool {
    match cmd {
        Command::Get { key, resp } => {
            let _ = resp.send(prefs.get_record(&key).cloned());
        }
        Command::Records { resp } => {
            let _ = resp.send(prefs.records().to_vec());
        }
        Command::SetRecord {
            key,
            value_type,
            value,
            resp,
        } => {
            let res = mutate(prefs, events_tx, PrefEvent::Changed { key: key.clone() }, |p| {
                p.set_record(&key, value_type, value)
            });
            let _ = resp.send(res);
        }
        Command::Delete { key, resp } => {
            let res = mutate(prefs, events_tx, PrefEvent::Removed { key: key.clone() }, |p| {
                p.delete_key(&key)
            });
            let _ = resp.send(res);
        }
        Command::AddToSet { key, value, resp } => {
            let res = check_set(prefs, &key).and_then(|()| {
                mutate(prefs, events_tx, PrefEvent::Changed { key: key.clone() }, |p| {
                    p.add_to_set(&key, &value)
                })
            });
            let _ = resp.send(res);
        }
        Command::RemoveFromSet { key, value, resp } => {
            let res = check_set(prefs, &key).and_then(|()| {
                mutate(prefs, events_tx, PrefEvent::Changed { key: key.clone() }, |p| {
                    p.remove_from_set(&key, &value)
                })
            });
            let _ = resp.send(res);
        }
        Command::Save { resp } => {
            let res = prefs.save();
            if res.is_ok() {
                let _ = events_tx.send(PrefEvent::Saved);
            }
            let _ = resp.send(res);
        }
        Command::Shutdown { resp } => {
            let res = if prefs.is_dirty() { prefs.save() } else { Ok(()) };
            let _ = resp.send(res);
            return true;
        }
    }

    false
}

/// Runs `f` and emits `event` if it changed the store.
fn mutate<F>(
    prefs: &mut Prefs,
    events_tx: &broadcast::Sender<PrefEvent>,
    event: PrefEvent,
    f: F,
) -> Result<(), StoreError>
where
    F: FnOnce(&mut Prefs) -> Result<(), StoreError>,
{
    let before = prefs.generation();
    f(prefs)?;
    if prefs.generation() != before {
        let _ = events_tx.send(event);
    }
    Ok(())
}

// Set helpers panic on a type mismatch; check here so the loop reports it
// back to the caller instead of dying.
fn check_set(prefs: &Prefs, key: &str) -> Result<(), StoreError> {
    match prefs.get_record(key) {
        Some(rec) if rec.value_type != ValueType::Set => Err(StoreError::TypeMismatch {
            key: key.to_owned(),
            expected: ValueType::Set,
            found: rec.value_type,
        }),
        _ => Ok(()),
    }
}
