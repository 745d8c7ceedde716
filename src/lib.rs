//! # Passkey Session Client
//!
//! Session lifecycle manager for a remote identity service. It establishes,
//! renews and terminates the user's session, and drives the passkey
//! (WebAuthn) registration and authentication ceremonies.
//!
//! ## Key Concepts
//! - **Session**: the authenticated identity of the current user, including
//!   the tokens needed to act on their behalf
//! - **Ceremony**: a challenge–response exchange between client,
//!   authenticator and server
//! - **Teardown**: resetting every user-scoped cache on logout
//!
//! ## Wiring
//! ```rust,no_run
//! use passkey_session::{session, Config, SessionContext};
//! use passkey_session::teardown::{TeardownRegistry, UserScoped};
//! use passkey_session::webauthn::NoAuthenticator;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let courses: UserScoped<Vec<String>> = UserScoped::new();
//! let teardown = TeardownRegistry::new()
//!     .with(courses.teardown_target("courses"))
//!     .build();
//!
//! let config = Config::from_env()?;
//! let ctx = SessionContext::from_config(&config, Arc::new(NoAuthenticator), teardown).await?;
//!
//! let user = session::login(&ctx, &session::Credentials::new("alice", "secret")).await?;
//! println!("hello {}", user.display_identity());
//! session::logout(&ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod state;
pub mod teardown;
pub mod transport;
pub mod webauthn;

pub use config::Config;
pub use error::{AuthError, AuthErrorKind, AuthResult, ErrorDetail};
pub use state::SessionContext;
