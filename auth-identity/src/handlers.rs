// Transport-facing adapters for the auth service
// Turn service outcomes into the uniform envelope plus HTTP status; the
// web framework wiring lives outside this crate.

use error_common::Envelope;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    models::{ChangePasswordRequest, ClientMeta, LoginRequest, LogoutRequest, RefreshRequest},
    service::AuthService,
    AuthError, Result,
};

/// HTTP status plus the serialized envelope body
pub type Reply = (u16, serde_json::Value);

pub struct AuthHandlers {
    service: Arc<AuthService>,
}

impl AuthHandlers {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }

    pub async fn login(&self, request: LoginRequest, client: ClientMeta) -> Reply {
        reply_with_message(self.service.login(&request, &client).await, "Login exitoso")
    }

    pub async fn refresh(&self, request: RefreshRequest) -> Reply {
        reply_with_message(
            self.service.refresh(&request.refresh_token).await,
            "Token renovado exitosamente",
        )
    }

    pub async fn logout(
        &self,
        access_token: &str,
        request: LogoutRequest,
        client: ClientMeta,
    ) -> Reply {
        match self
            .service
            .logout(access_token, request.refresh_token.as_deref(), &client)
            .await
        {
            Ok(()) => message_reply("Logout exitoso"),
            Err(e) => error_reply(&e),
        }
    }

    pub async fn change_password(
        &self,
        access_token: &str,
        request: ChangePasswordRequest,
        client: ClientMeta,
    ) -> Reply {
        match self
            .service
            .change_password(access_token, &request, &client)
            .await
        {
            Ok(()) => message_reply("Contraseña cambiada exitosamente"),
            Err(e) => error_reply(&e),
        }
    }

    pub async fn current_user(&self, access_token: &str) -> Reply {
        reply(self.service.current_user(access_token).await)
    }

    pub async fn sessions(&self, access_token: &str) -> Reply {
        reply(
            self.service
                .list_sessions(access_token)
                .await
                .map(|sessions| serde_json::json!({ "sessions": sessions })),
        )
    }

    pub async fn revoke_session(
        &self,
        access_token: &str,
        session_id: Uuid,
        client: ClientMeta,
    ) -> Reply {
        match self
            .service
            .revoke_session(access_token, session_id, &client)
            .await
        {
            Ok(()) => message_reply("Sesión revocada exitosamente"),
            Err(e) => error_reply(&e),
        }
    }
}

fn reply<T: Serialize>(result: Result<T>) -> Reply {
    match result {
        Ok(data) => envelope_reply(Envelope::success(data)),
        Err(e) => error_reply(&e),
    }
}

fn reply_with_message<T: Serialize>(result: Result<T>, message: &str) -> Reply {
    match result {
        Ok(data) => envelope_reply(Envelope::success_with_message(data, message)),
        Err(e) => error_reply(&e),
    }
}

fn message_reply(message: &str) -> Reply {
    envelope_reply(Envelope::<serde_json::Value>::message_only(message))
}

fn error_reply(error: &AuthError) -> Reply {
    envelope_reply(Envelope::<serde_json::Value>::error(
        error.code(),
        error.public_message(),
    ))
}

fn envelope_reply<T: Serialize>(envelope: Envelope<T>) -> Reply {
    let status = envelope.status();
    let body = serde_json::to_value(&envelope)
        .unwrap_or_else(|_| serde_json::json!({ "success": envelope.success }));

    (status, body)
}
