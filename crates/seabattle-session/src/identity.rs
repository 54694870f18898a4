//! Identity hook for connected players.
//!
//! Seabattle doesn't authenticate anyone itself. The first text frame on a
//! connection is a token, and an [`IdentityProvider`] turns it into a
//! stable [`PlayerId`]. The same provider knows whether that player is
//! already part of an unfinished game, which is what sends them down the
//! resume path instead of the room list.

use std::future::Future;

use seabattle_protocol::{PlayerId, RoomId};

use crate::SessionError;

/// Resolves tokens to player identities.
///
/// # Example
///
/// ```rust
/// use seabattle_protocol::{PlayerId, RoomId};
/// use seabattle_session::{IdentityProvider, SessionError};
///
/// /// Uses the token itself as the username. Development only.
/// struct DevIdentity;
///
/// impl IdentityProvider for DevIdentity {
///     async fn identify(&self, token: &str) -> Result<PlayerId, SessionError> {
///         let name = token.trim();
///         if name.is_empty() {
///             return Err(SessionError::AuthFailed("empty token".into()));
///         }
///         Ok(PlayerId::new(name))
///     }
///
///     async fn active_room(
///         &self,
///         _player: &PlayerId,
///     ) -> Result<Option<RoomId>, SessionError> {
///         Ok(None)
///     }
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Validates the token and returns the player's identity.
    ///
    /// # Returns
    /// - `Ok(PlayerId)`: the token is valid
    /// - `Err(SessionError::AuthFailed)`: the token is invalid or expired
    fn identify(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<PlayerId, SessionError>> + Send;

    /// Returns the room of the player's unfinished game, if any.
    fn active_room(
        &self,
        player: &PlayerId,
    ) -> impl Future<Output = Result<Option<RoomId>, SessionError>> + Send;
}
