//! Session revocation

use tees_admin_client::SessionsApi;

use crate::error::{Error, Result};

/// Revoke one session by its token id.
pub async fn revoke(api: &dyn SessionsApi, jti: &str) -> Result<()> {
    let jti = non_blank(jti, "session id")?;
    api.revoke_session(jti).await?;
    tracing::info!(jti = %jti, "Session revoked");
    Ok(())
}

/// Revoke every session belonging to a user.
pub async fn revoke_user(api: &dyn SessionsApi, user_id: &str) -> Result<()> {
    let user_id = non_blank(user_id, "user id")?;
    api.revoke_user_sessions(user_id).await?;
    tracing::info!(user_id = %user_id, "All sessions of user revoked");
    Ok(())
}

fn non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::InvalidInput(format!("{what} must not be empty")))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl SessionsApi for Recorder {
        async fn revoke_session(&self, jti: &str) -> tees_admin_client::Result<()> {
            self.0.lock().unwrap().push(format!("jti:{jti}"));
            Ok(())
        }

        async fn revoke_user_sessions(&self, user_id: &str) -> tees_admin_client::Result<()> {
            self.0.lock().unwrap().push(format!("user:{user_id}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_revocations_are_forwarded_trimmed() {
        let api = Recorder::default();
        revoke(&api, " 9f2c ").await.unwrap();
        revoke_user(&api, "u42").await.unwrap();
        assert_eq!(*api.0.lock().unwrap(), ["jti:9f2c", "user:u42"]);
    }

    #[tokio::test]
    async fn test_blank_ids_rejected_locally() {
        let api = Recorder::default();
        assert!(matches!(revoke(&api, "  ").await, Err(Error::InvalidInput(_))));
        assert!(api.0.lock().unwrap().is_empty());
    }
}
