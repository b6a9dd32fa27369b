//! The bot
//!
//! Wires the registry, command handler, enforcement gate, allow-list and
//! sweeper together and dispatches inbound events. Every command or
//! activity event gets its own task; the fan-out is unbounded, which is
//! fine for chat-scale traffic since each task is a few lock operations and
//! at most a handful of sends.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use zenbot_core::Config;

use crate::allowlist::ChannelAllowList;
use crate::clock::Clock;
use crate::commands::{SessionCommandHandler, ZenCommand};
use crate::console::read_events;
use crate::error::FatalAuthError;
use crate::events::{ActivityKind, InboundEvent};
use crate::gate::EnforcementGate;
use crate::ports::{ChannelDirectory, NotificationSink, UserDirectory};
use crate::registry::SessionRegistry;
use crate::sweeper::ExpirationSweeper;

const EVENT_BUFFER: usize = 256;

/// External services the bot talks to
pub struct Collaborators {
    pub sink: Arc<dyn NotificationSink>,
    pub users: Arc<dyn UserDirectory>,
    pub channels: Arc<dyn ChannelDirectory>,
    pub clock: Arc<dyn Clock>,
}

pub struct Bot {
    registry: Arc<SessionRegistry>,
    commands: SessionCommandHandler,
    gate: EnforcementGate,
    allowlist: ChannelAllowList,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    debug: bool,
}

impl Bot {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            sink,
            users,
            channels,
            clock,
        } = collaborators;
        let registry = Arc::new(SessionRegistry::new());

        Self {
            commands: SessionCommandHandler::new(
                Arc::clone(&registry),
                users,
                Arc::clone(&clock),
                config.initial_grace(),
            ),
            gate: EnforcementGate::new(Arc::clone(&registry), Arc::clone(&sink), config.cooldown()),
            allowlist: ChannelAllowList::new(config.channel_allowlist.clone(), channels),
            registry,
            sink,
            clock,
            sweep_interval: config.sweep_interval(),
            debug: config.debug,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// A sweeper over this bot's registry
    pub fn sweeper(&self) -> ExpirationSweeper {
        ExpirationSweeper::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.sink),
            Arc::clone(&self.clock),
            self.sweep_interval,
        )
    }

    /// Consume events until the stream ends or credentials are rejected.
    ///
    /// The sweeper runs alongside and is stopped, after in-flight handlers
    /// finish, before this returns.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<InboundEvent>,
    ) -> Result<(), FatalAuthError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = tokio::spawn(self.sweeper().run(shutdown_rx));
        let mut tasks = JoinSet::new();

        let result = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.dispatch(event, &mut tasks) {
                            break Err(e);
                        }
                    }
                    None => {
                        info!("Event stream closed");
                        break Ok(());
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Event handler failed: {}", e);
                    }
                }
            }
        };

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Event handler failed: {}", e);
            }
        }

        let _ = shutdown_tx.send(true);
        if let Err(e) = sweeper.await {
            error!("Sweeper task failed: {}", e);
        }

        result
    }

    /// Run on JSON-lines events read from `reader`.
    ///
    /// Returns as soon as [`run`](Self::run) does. The reader task is
    /// aborted rather than waited for, so an input that stays open does not
    /// keep the bot alive after a fatal error.
    pub async fn serve<R>(self: Arc<Self>, reader: R) -> Result<(), FatalAuthError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_events(reader, tx));

        let result = self.run(rx).await;

        if reader.is_finished() {
            if let Ok(Err(e)) = reader.await {
                error!("Failed to read events: {}", e);
            }
        } else {
            reader.abort();
        }

        result
    }

    fn dispatch(
        self: &Arc<Self>,
        event: InboundEvent,
        tasks: &mut JoinSet<()>,
    ) -> Result<(), FatalAuthError> {
        match event {
            InboundEvent::Message {
                user,
                channel,
                text,
            } => {
                let bot = Arc::clone(self);
                tasks.spawn(async move { bot.handle_message(&user, &channel, &text).await });
            }
            InboundEvent::Activity { user, kind } => {
                let bot = Arc::clone(self);
                tasks.spawn(async move { bot.report_activity(&user, kind).await });
            }
            InboundEvent::Connected {
                connection_count,
                info,
            } => {
                info!("Connected to chat transport");
                if self.debug {
                    debug!("Connection count: {}", connection_count);
                    if let Some(info) = info {
                        debug!("Connection info: {}", info);
                    }
                }
            }
            InboundEvent::TransportError { message } => {
                error!("Transport error: {}", message);
            }
            InboundEvent::InvalidAuth => {
                error!("Invalid transport credentials");
                return Err(FatalAuthError);
            }
        }
        Ok(())
    }

    /// Handle a chat message; anything that is not a `./zen` command is ignored
    pub async fn handle_message(&self, user: &str, channel: &str, text: &str) {
        let Some(command) = ZenCommand::parse(text) else {
            return;
        };

        if !self.allowlist.permits(channel).await {
            return;
        }

        match command {
            ZenCommand::Usage(usage) => self.reply(usage, channel).await,
            ZenCommand::Start {
                duration_text,
                reason,
            } => {
                match self
                    .commands
                    .start_session(user, channel, &duration_text, &reason)
                    .await
                {
                    Ok(ack) => self.reply(&ack.message, channel).await,
                    Err(e) => self.reply(&e.to_string(), channel).await,
                }
            }
            ZenCommand::Cancel { reason } => {
                let outcome = self.commands.cancel_session(user, reason.as_deref());
                for reply in outcome.replies() {
                    self.reply(&reply, channel).await;
                }
            }
        }
    }

    /// Enforce the user's zen, if any, for activity happening now
    pub async fn report_activity(&self, user: &str, kind: ActivityKind) {
        self.gate
            .report_activity(user, kind.label(), self.clock.now())
            .await;
    }

    async fn reply(&self, text: &str, channel: &str) {
        if let Err(e) = self.sink.send(text, channel).await {
            warn!("Failed to deliver reply to {}: {}", channel, e);
        }
    }
}
