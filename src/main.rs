//! # Passkey Session CLI
//!
//! Command-line front end for the session manager. Useful for poking an
//! identity service by hand: log in, refresh, inspect and log out, with the
//! refresh token kept in SQLite between invocations.
//!
//! Passkey ceremonies are not offered here; a terminal has no platform
//! authenticator.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use passkey_session::session::{
    self, Credentials, EmailVerification, PasswordReset, PasswordResetRequest, SignupRequest,
};
use passkey_session::teardown::Teardown;
use passkey_session::webauthn::NoAuthenticator;
use passkey_session::{AuthError, AuthResult, Config, SessionContext};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "passkey-session", version, about = "Manage a session with the identity service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in with a username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "PASSKEY_SESSION_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "PASSKEY_SESSION_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Renew the session with the stored refresh token
    Refresh,
    /// End the session
    Logout,
    /// Show the current user
    Whoami,
    /// List federated identity providers
    Providers,
    /// Send a verification email to the current user
    RequestVerification,
    /// Confirm the email address with a verification token
    VerifyEmail {
        #[arg(long)]
        token: String,
    },
    /// Send a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long, env = "PASSKEY_SESSION_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Default: info level for most crates, debug level for this crate.
    // Can be overridden with RUST_LOG. Logs go to stderr; stdout is for JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    tracing::debug!("Configuration loaded: {:?}", config);

    // The CLI caches nothing user-scoped, so there is nothing to tear down.
    let ctx = SessionContext::from_config(&config, Arc::new(NoAuthenticator), Teardown::default())
        .await?;

    let output = run(&ctx, cli.command).await;
    match output {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => bail!("{} [{}]", err, err.code()),
    }
}

async fn run(ctx: &SessionContext, command: Command) -> AuthResult<Value> {
    match command {
        Command::Login { username, password } => {
            let user = session::login(ctx, &Credentials::new(username, password)).await?;
            Ok(user.summary())
        }
        Command::Signup {
            username,
            email,
            password,
        } => {
            let request = SignupRequest {
                username,
                email,
                password,
            };
            Ok(session::signup(ctx, &request).await?.summary())
        }
        Command::Refresh => Ok(session::refresh(ctx).await?.summary()),
        Command::Logout => {
            resume(ctx).await?;
            session::logout(ctx).await
        }
        Command::Whoami => Ok(resume(ctx).await?.summary()),
        Command::Providers => {
            let providers = session::list_providers(ctx).await?;
            Ok(serde_json::to_value(providers).unwrap_or(Value::Null))
        }
        Command::RequestVerification => {
            resume(ctx).await?;
            session::request_email_verification(ctx).await
        }
        Command::VerifyEmail { token } => {
            resume(ctx).await?;
            session::verify_account(ctx, &EmailVerification { token }).await
        }
        Command::ForgotPassword { email } => {
            session::forgot_password(ctx, &PasswordResetRequest { email }).await
        }
        Command::ResetPassword { token, password } => {
            session::reset_password(ctx, &PasswordReset { token, password }).await
        }
    }
}

/// Each invocation starts without a session; bring back the one the
/// previous invocation left by renewing the stored refresh token.
async fn resume(ctx: &SessionContext) -> Result<session::Session, AuthError> {
    match ctx.current_session() {
        Some(current) => Ok(current),
        None => session::refresh(ctx).await,
    }
}
