//! Remote identity: sign-in, sign-up, token refresh and the persisted session.
//!
//! [`CredentialManager`] is the only holder of the access token. The sync layer
//! asks it for a token on every pass and never caches one itself.

mod backend;
mod firebase;
mod manager;
mod session;

pub use backend::{AuthBackend, AuthTokens};
pub use firebase::{classify_auth_message, FirebaseAuth};
pub use manager::{AccessToken, CredentialManager, Session, SessionPhase, MIN_PASSWORD_LEN};
pub use session::{PersistedSession, SessionStore, EMAIL_KEY, REFRESH_TOKEN_KEY, USER_ID_KEY};
