//! # dealroom-core
//!
//! Shared vocabulary for the dealroom chat layer between a loan applicant
//! and their sales manager:
//!
//! - **Branded IDs**: [`MessageId`], [`ParticipantId`], [`ConnectionId`]
//! - **Messages**: canonical [`Message`], outbound [`OutboundMessage`], [`Room`]
//! - **Raw records**: [`RawMessage`] accepting wire and persisted field names
//! - **Normalization**: [`normalize_message`] and the reusable [`Normalizer`]
//! - **Validation**: [`is_valid_message`] gate for outbound candidates
//! - **Humanizer**: [`humanize`] relative / absolute message times
//! - **Clock**: injectable time source for defaults and humanizing
//! - **Logging**: subscriber setup and test capture

#![deny(unsafe_code)]

pub mod clock;
pub mod constants;
pub mod errors;
pub mod humanize;
pub mod ids;
pub mod logging;
pub mod message;
pub mod normalize;
pub mod raw;
pub mod validate;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{CoreError, Result};
pub use humanize::{ClockStyle, humanize, humanize_at};
pub use ids::{ConnectionId, MessageId, ParticipantId};
pub use message::{Message, OutboundMessage, Room, SenderKind};
pub use normalize::{Normalizer, normalize_message};
pub use raw::{PersistedFields, RawMessage, WireFields};
pub use validate::{is_valid_message, is_valid_outbound};
