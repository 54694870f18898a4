//! Wire protocol for Seabattle.
//!
//! Clients and the server talk in plain text frames. This crate defines
//! both directions of that conversation:
//!
//! - **Types** ([`PlayerId`], [`RoomId`]): the identifiers every layer
//!   passes around.
//! - **Parsing** ([`parse_ship_type`], [`parse_vertical`],
//!   [`parse_coordinate`], [`RoomChoice`]): turning client tokens into
//!   typed values.
//! - **Notices** ([`Notice`]): every text the server sends back.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how structured values are
//!   converted to bytes for the resume cache and cross-process relay.
//!
//! ```text
//! Transport (text) → Protocol (tokens / notices) → Room + Turn protocol
//! ```

mod codec;
mod error;
mod notice;
mod parse;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use notice::Notice;
pub use parse::{RoomChoice, parse_coordinate, parse_ship_type, parse_vertical};
pub use types::{PlayerId, RoomId};
