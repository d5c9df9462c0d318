//! Authentication & authorization core.
//!
//! Request flow: `principal::resolve_principal` consults the `policy::AccessPolicy` route
//! table, verifies bearer tokens with `token::TokenService` and attaches the resulting
//! `Principal`. Login goes through `throttle::LoginThrottle` before a token is ever issued.
//! Handlers that mutate a specific resource call `policy::authorize_ownership` first.

pub mod clock;
pub mod password;
pub mod policy;
pub mod principal;
pub mod throttle;
pub mod token;

pub use clock::{Clock, ClockState, ManualClock, SystemClock};
pub use password::{Argon2Hasher, CredentialHasher, HasherState};
pub use policy::{Access, AccessPolicy, authorize_ownership, authorize_view};
pub use principal::{MaybePrincipal, Principal};
pub use throttle::{LoginThrottle, normalize_identifier};
pub use token::{Identity, TokenService};
