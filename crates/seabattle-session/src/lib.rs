//! Player session management for Seabattle.
//!
//! This crate handles everything tied to a player's identity rather than
//! to a room:
//!
//! 1. **Identity**: who is on the other end of a connection
//!    ([`IdentityProvider`] trait)
//! 2. **Session tracking**: one live connection per identity
//!    ([`SessionManager`])
//! 3. **Resume**: a player's board survives a disconnect in an external
//!    key-value cache ([`ResumeCache`] over a [`CacheStore`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← pairs sessions into rooms, saves boards on change
//!     ↕
//! Session Layer (this crate)  ← identity, connection state, cached boards
//!     ↕
//! Protocol / Board (below)  ← PlayerId, Codec, Board + BoardSnapshot
//! ```

mod error;
mod identity;
mod manager;
mod resume;

pub use error::{CacheError, SessionError};
pub use identity::IdentityProvider;
pub use manager::{Session, SessionManager};
pub use resume::{CacheStore, InMemoryCache, ResumeCache};
