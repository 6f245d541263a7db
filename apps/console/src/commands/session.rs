//! `session` (local credentials) and `sessions` (server-side revocation)

use clap::Subcommand;
use serde_json::json;
use std::process::ExitCode;
use tees_admin_client::{Session, SessionState};

use super::Context;
use crate::sessions;

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Check the current token against the server
    Show,

    /// Store a bearer token for later commands
    SetToken {
        token: String,

        /// Store without checking it against the server
        #[arg(long)]
        no_verify: bool,
    },

    /// Forget the stored token
    Logout,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// Revoke one session by token id (jti)
    Revoke { jti: String },

    /// Revoke every session of a user
    RevokeUser { user_id: String },
}

pub async fn run_session(ctx: &Context, command: SessionCommand) -> anyhow::Result<ExitCode> {
    match command {
        SessionCommand::Show => show(ctx).await,
        SessionCommand::SetToken { token, no_verify } => {
            let stored_at = ctx
                .client
                .session()
                .set_token(token.trim(), ctx.config.api.persist_session)
                .await?;
            match stored_at {
                Some(path) => eprintln!("Token stored in {}", path.display()),
                None => eprintln!("Token set for this run only; nothing was stored."),
            }
            if no_verify {
                return Ok(ExitCode::SUCCESS);
            }
            show(ctx).await
        }
        SessionCommand::Logout => {
            match &ctx.store {
                Some(store) => {
                    Session::new(Some(store.clone())).logout().await?;
                    println!("Logged out; removed {}", store.path().display());
                }
                None => println!("No session file configured; nothing to remove."),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub async fn run_sessions(ctx: &Context, command: SessionsCommand) -> anyhow::Result<ExitCode> {
    match command {
        SessionsCommand::Revoke { jti } => {
            sessions::revoke(ctx.client.as_ref(), &jti).await?;
            println!("Session {} revoked.", jti.trim());
        }
        SessionsCommand::RevokeUser { user_id } => {
            sessions::revoke_user(ctx.client.as_ref(), &user_id).await?;
            println!("All sessions of user {} revoked.", user_id.trim());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn show(ctx: &Context) -> anyhow::Result<ExitCode> {
    match ctx.client.validate_session().await {
        Ok(user) => {
            if ctx.json {
                ctx.print_json(&json!({ "state": "ready", "user": user }))?;
            } else {
                println!("Signed in as {}", user.display_name());
                if let Some(role) = &user.role {
                    println!("Role: {role}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let state = ctx.client.session().state().await;
            if ctx.json {
                ctx.print_json(&json!({ "state": state.name(), "error": e.to_string() }))?;
            } else if matches!(state, SessionState::Expired) {
                println!("Session expired. Set a new token with `session set-token`.");
            } else {
                println!("Not signed in: {e}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
