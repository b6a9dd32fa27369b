//! zenbot - zen sessions for chat
//!
//! "Leave me alone for an hour."
//!
//! A user starts a zen with `./zen 1h30m [reason]`. While it runs, any
//! typing, reacting, starring or pinning by that user is called out in the
//! zen's channel, at most once per cooldown window. Zens end by themselves
//! when their time is up, or early with `./zen cancel [reason]`.
//!
//! Core pieces:
//! - [`SessionRegistry`]: the synchronized store of live zens
//! - [`ExpirationSweeper`]: background loop retiring ended zens
//! - [`EnforcementGate`]: rate-limited violation notices
//! - [`SessionCommandHandler`]: `./zen` start/cancel commands
//!
//! [`Bot`] wires them to a transport through the traits in [`ports`].

pub mod allowlist;
pub mod bot;
pub mod clock;
pub mod commands;
pub mod console;
pub mod duration;
pub mod error;
pub mod events;
pub mod gate;
pub mod ports;
pub mod registry;
pub mod session;
pub mod sweeper;

pub use bot::{Bot, Collaborators};
pub use commands::{CancelOutcome, SessionCommandHandler, StartAck, ZenCommand};
pub use error::{CommandError, DeliveryError, DurationError, FatalAuthError, ResolutionError};
pub use events::{ActivityKind, InboundEvent};
pub use gate::EnforcementGate;
pub use registry::{SessionRegistry, Violation};
pub use session::{Session, SessionId};
pub use sweeper::ExpirationSweeper;
