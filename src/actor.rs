//! # Session Actor
//!
//! Mailbox wrapper for hosts where fixes arrive on other threads.
//!
//! A tokio task owns the [`RunSession`] and drains one unbounded channel.
//! Lifecycle commands from [`SessionHandle`]s and fix/error events from the
//! source's [`EventSink`] share that channel, so they are applied strictly one
//! at a time in arrival order and the session needs no locking.
//!
//! ```text
//! ┌──────────────┐  start/pause/...  ┌─────────────────────┐
//! │ SessionHandle│──────────────────►│                     │
//! └──────────────┘                   │  mailbox (mpsc)     │──► RunSession
//! ┌──────────────┐  Fix / Error      │                     │
//! │  EventSink   │──────────────────►│                     │
//! └──────────────┘                   └─────────────────────┘
//! ```
//!
//! The sink only holds a weak sender: the task ends once every handle is
//! dropped (or on `shutdown`), even while a source still has a sink. On exit
//! the session is dropped, which closes its subscription, and the task
//! resolves to the final snapshot.

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Result, RunError, SourceError};
use crate::session::{RunSession, RunSnapshot};
use crate::source::{
    Clock, PositionSource, SourceEvent, SourceOptions, SubscriptionId, SystemClock,
};
use crate::{GeoPoint, RunConfig};

enum Command {
    Start,
    BeginRecording,
    Pause,
    Resume,
    Finish,
    Reset,
    Source(SourceEvent),
    Snapshot(oneshot::Sender<RunSnapshot>),
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Start => write!(f, "Start"),
            Command::BeginRecording => write!(f, "BeginRecording"),
            Command::Pause => write!(f, "Pause"),
            Command::Resume => write!(f, "Resume"),
            Command::Finish => write!(f, "Finish"),
            Command::Reset => write!(f, "Reset"),
            Command::Source(event) => write!(f, "Source({})", event.subscription),
            Command::Snapshot(_) => write!(f, "Snapshot"),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Cloneable handle for driving a session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| RunError::SessionClosed)
    }

    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn begin_recording(&self) -> Result<()> {
        self.send(Command::BeginRecording)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn finish(&self) -> Result<()> {
        self.send(Command::Finish)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Current state, after every command queued before this call.
    pub async fn snapshot(&self) -> Result<RunSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        response.await.map_err(|_| RunError::SessionClosed)
    }

    /// Stop the actor after the commands already queued.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Another sink into this actor's mailbox.
    pub fn event_sink(&self) -> EventSink {
        EventSink {
            tx: self.tx.downgrade(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Where a position source delivers its events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl EventSink {
    /// Deliver an event. Returns false once the actor has gone away.
    pub fn send(&self, event: SourceEvent) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(Command::Source(event)).is_ok(),
            None => false,
        }
    }

    pub fn fix(&self, subscription: SubscriptionId, fix: GeoPoint) -> bool {
        self.send(SourceEvent::fix(subscription, fix))
    }

    pub fn error(&self, subscription: SubscriptionId, error: SourceError) -> bool {
        self.send(SourceEvent::error(subscription, error))
    }
}

/// Spawn a session actor on the current tokio runtime, using the system clock.
///
/// `make_source` receives the sink the source must deliver events to.
/// Must be called from within a tokio runtime.
pub fn spawn_session<S, F>(
    config: RunConfig,
    options: SourceOptions,
    make_source: F,
) -> Result<(SessionHandle, JoinHandle<RunSnapshot>)>
where
    F: FnOnce(EventSink) -> S,
    S: PositionSource + Send + 'static,
    S::Subscription: Send + 'static,
{
    spawn_session_with_clock(config, options, SystemClock, make_source)
}

/// Like [`spawn_session`] with a custom clock.
pub fn spawn_session_with_clock<S, C, F>(
    config: RunConfig,
    options: SourceOptions,
    clock: C,
    make_source: F,
) -> Result<(SessionHandle, JoinHandle<RunSnapshot>)>
where
    F: FnOnce(EventSink) -> S,
    S: PositionSource + Send + 'static,
    S::Subscription: Send + 'static,
    C: Clock + Send + 'static,
{
    config.validate()?;

    let (tx, rx) = mpsc::unbounded_channel();
    let source = make_source(EventSink { tx: tx.downgrade() });
    let session = RunSession::with_clock(source, config, clock)?.with_source_options(options);

    let task = tokio::spawn(run_mailbox(session, rx));
    info!("[SessionActor] Spawned");
    Ok((SessionHandle { tx }, task))
}

async fn run_mailbox<S, C>(
    mut session: RunSession<S, C>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> RunSnapshot
where
    S: PositionSource,
    C: Clock,
{
    while let Some(command) = rx.recv().await {
        match command {
            Command::Start => session.start(),
            Command::BeginRecording => session.begin_recording(),
            Command::Pause => session.pause(),
            Command::Resume => session.resume(),
            Command::Finish => session.finish(),
            Command::Reset => session.reset(),
            Command::Source(event) => {
                session.handle_source_event(event);
            }
            Command::Snapshot(reply) => {
                // Caller may have stopped waiting
                let _ = reply.send(session.snapshot());
            }
            Command::Shutdown => {
                debug!("[SessionActor] Shutdown requested");
                break;
            }
        }
    }

    let snapshot = session.snapshot();
    drop(session);
    info!(
        "[SessionActor] Stopped ({}, {} samples)",
        snapshot.status,
        snapshot.samples.len()
    );
    snapshot
}
