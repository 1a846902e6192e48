//! Integration tests for the auth gateway
//!
//! Exercises the full login/refresh/logout/change-password lifecycle over
//! the in-memory store:
//! 1. Successful login response shape (tokens, permissions, expires_in)
//! 2. Brute-force lockout at the fifth failed attempt
//! 3. Locked account with the correct password stays locked
//! 4. Counter reset after a successful login
//! 5. Refresh token revocation via logout
//! 6. Password change mass-revokes refresh tokens
//! 7. Session enumeration and ownership-checked deletion
//! 8. Permission guard behavior

use auth_identity::*;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

fn test_user(legajo: &str, password: &str, role_id: Option<Uuid>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        legajo: legajo.to_string(),
        username: format!("user.{legajo}"),
        email: format!("{legajo}@sigpol.ar"),
        password_hash: password::hash_password(password).unwrap(),
        nombre: Some("Nombre".to_string()),
        apellido: Some("Apellido".to_string()),
        rango: Some("Oficial".to_string()),
        area: Some("Cibercrimen".to_string()),
        role_id,
        is_active: true,
        email_verified: true,
        failed_login_attempts: 0,
        locked_until: None,
        last_login: None,
        password_changed_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn test_role(name: &str, permissions: &[&str]) -> RoleAssignment {
    let now = Utc::now();
    RoleAssignment {
        role: Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: Some(format!("Rol {name}")),
            created_at: now,
        },
        permissions: permissions
            .iter()
            .map(|name| Permission {
                id: Uuid::new_v4(),
                name: (*name).to_string(),
                description: None,
                created_at: now,
            })
            .collect(),
    }
}

struct Fixture {
    store: Arc<MemoryAuthStore>,
    service: Arc<AuthService>,
}

fn setup() -> Fixture {
    let store = Arc::new(MemoryAuthStore::new());
    let service = Arc::new(AuthService::with_store(store.clone(), AuthConfig::default()));
    Fixture { store, service }
}

async fn login(fixture: &Fixture, legajo: &str, password: &str) -> Result<LoginResponse> {
    fixture
        .service
        .login(
            &LoginRequest {
                legajo: legajo.to_string(),
                password: password.to_string(),
            },
            &ClientMeta {
                ip_address: Some("10.0.0.1".to_string()),
                user_agent: Some("sigpol-tests".to_string()),
            },
        )
        .await
}

#[tokio::test]
async fn test_successful_login_response_shape() {
    let fixture = setup();
    let role = test_role("operador", &["protocolos.ver", "whoiswho.ver"]);
    let role_id = role.role.id;
    fixture.store.insert_role(role);
    fixture.store.insert_user(test_user("A1", "Secreta1", Some(role_id)));

    let response = login(&fixture, "A1", "Secreta1").await.unwrap();

    // expires_in must equal the access-token lifetime in seconds
    assert_eq!(response.expires_in, 900);
    assert!(!response.access_token.is_empty());
    assert!(!response.refresh_token.is_empty());
    assert_eq!(response.user.legajo, "A1");
    assert_eq!(
        response.user.permissions,
        vec!["protocolos.ver", "whoiswho.ver"]
    );

    // exactly one session and one refresh-token row per login
    assert_eq!(fixture.store.session_count(), 1);
}

#[tokio::test]
async fn test_unknown_legajo_is_generic_denial() {
    let fixture = setup();

    let err = login(&fixture, "NO-EXISTE", "Secreta1").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(err.status(), 401);
}

#[tokio::test]
async fn test_fifth_failed_attempt_locks_the_account() {
    let fixture = setup();
    let user = test_user("A1", "Secreta1", None);
    let user_id = user.id;
    fixture.store.insert_user(user);

    for _ in 0..4 {
        let err = login(&fixture, "A1", "incorrecta").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = login(&fixture, "A1", "incorrecta").await.unwrap_err();
    assert_eq!(err.status(), 403);
    match &err {
        AuthError::AccountLocked { remaining_minutes } => {
            assert!(*remaining_minutes > 0 && *remaining_minutes <= 30);
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }
    assert!(err.to_string().contains("minutos"));

    // The lock is stamped on the user row
    let stored = fixture.store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 5);
    let until = stored.locked_until.expect("lock timestamp must be set");
    assert!(until > Utc::now() + Duration::minutes(29));
    assert!(until <= Utc::now() + Duration::minutes(30));
}

#[tokio::test]
async fn test_locked_account_rejects_the_correct_password() {
    let fixture = setup();
    let mut user = test_user("A1", "Secreta1", None);
    user.failed_login_attempts = 5;
    user.locked_until = Some(Utc::now() + Duration::minutes(10));
    fixture.store.insert_user(user);

    let err = login(&fixture, "A1", "Secreta1").await.unwrap_err();
    match err {
        AuthError::AccountLocked { remaining_minutes } => {
            assert!(remaining_minutes > 0 && remaining_minutes <= 10);
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }
}

#[tokio::test]
async fn test_successful_login_resets_expired_lock() {
    let fixture = setup();
    let mut user = test_user("A1", "Secreta1", None);
    user.failed_login_attempts = 3;
    // expired lock: login must succeed and clear both counters
    user.locked_until = Some(Utc::now() - Duration::minutes(1));
    let user_id = user.id;
    fixture.store.insert_user(user);

    login(&fixture, "A1", "Secreta1").await.unwrap();

    let stored = fixture.store.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(stored.locked_until.is_none());
    assert!(stored.last_login.is_some());
}

#[tokio::test]
async fn test_inactive_user_is_denied_with_specific_reason() {
    let fixture = setup();
    let mut user = test_user("A1", "Secreta1", None);
    user.is_active = false;
    fixture.store.insert_user(user);

    let err = login(&fixture, "A1", "Secreta1").await.unwrap_err();
    assert!(matches!(err, AuthError::UserInactive));
    assert_eq!(err.status(), 403);
}

#[tokio::test]
async fn test_refresh_issues_a_new_access_token_only() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();
    let renewed = fixture.service.refresh(&admitted.refresh_token).await.unwrap();

    assert_eq!(renewed.expires_in, 900);
    assert!(!renewed.access_token.is_empty());

    // the same refresh token keeps working until revoked
    fixture.service.refresh(&admitted.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_revoked_refresh_token_is_never_accepted() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();

    fixture
        .service
        .logout(
            &admitted.access_token,
            Some(&admitted.refresh_token),
            &ClientMeta::default(),
        )
        .await
        .unwrap();

    for _ in 0..3 {
        let err = fixture
            .service
            .refresh(&admitted.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
        assert_eq!(err.status(), 401);
    }
}

#[tokio::test]
async fn test_logout_without_refresh_token_is_a_noop() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();

    fixture
        .service
        .logout(&admitted.access_token, None, &ClientMeta::default())
        .await
        .unwrap();

    // the refresh token is still usable and the session row survives
    fixture.service.refresh(&admitted.refresh_token).await.unwrap();
    assert_eq!(fixture.store.session_count(), 1);
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();

    let err = fixture
        .service
        .refresh(&admitted.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn test_change_password_revokes_every_refresh_token() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    // two devices, two refresh tokens
    let first = login(&fixture, "A1", "Secreta1").await.unwrap();
    let second = login(&fixture, "A1", "Secreta1").await.unwrap();

    fixture
        .service
        .change_password(
            &first.access_token,
            &ChangePasswordRequest {
                old_password: "Secreta1".to_string(),
                new_password: "Abcdef12".to_string(),
            },
            &ClientMeta::default(),
        )
        .await
        .unwrap();

    for token in [&first.refresh_token, &second.refresh_token] {
        let err = fixture.service.refresh(token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    // old password no longer works, the new one does
    let err = login(&fixture, "A1", "Secreta1").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    login(&fixture, "A1", "Abcdef12").await.unwrap();
}

#[tokio::test]
async fn test_change_password_rejects_wrong_current_password() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();

    let err = fixture
        .service
        .change_password(
            &admitted.access_token,
            &ChangePasswordRequest {
                old_password: "incorrecta".to_string(),
                new_password: "Abcdef12".to_string(),
            },
            &ClientMeta::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidPassword));
    assert_eq!(err.status(), 401);
}

#[tokio::test]
async fn test_change_password_enforces_the_policy() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();

    for weak in ["corta1A", "sinmayuscula1", "SinNumeros"] {
        let err = fixture
            .service
            .change_password(
                &admitted.access_token,
                &ChangePasswordRequest {
                    old_password: "Secreta1".to_string(),
                    new_password: weak.to_string(),
                },
                &ClientMeta::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Validation(_)), "{weak} should fail");
        assert_eq!(err.status(), 400);
    }
}

#[tokio::test]
async fn test_sessions_are_listed_newest_first() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));

    let first = login(&fixture, "A1", "Secreta1").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = login(&fixture, "A1", "Secreta1").await.unwrap();

    let sessions = fixture
        .service
        .list_sessions(&second.access_token)
        .await
        .unwrap();

    assert_eq!(sessions.len(), 2);
    assert!(sessions[0].created_at >= sessions[1].created_at);
    assert_eq!(sessions[0].ip_address.as_deref(), Some("10.0.0.1"));

    // both logins still hold valid access tokens (multi-device)
    fixture.service.current_user(&first.access_token).await.unwrap();
}

#[tokio::test]
async fn test_session_deletion_checks_ownership() {
    let fixture = setup();
    fixture.store.insert_user(test_user("A1", "Secreta1", None));
    fixture.store.insert_user(test_user("B2", "Secreta1", None));

    let owner = login(&fixture, "A1", "Secreta1").await.unwrap();
    let intruder = login(&fixture, "B2", "Secreta1").await.unwrap();

    let sessions = fixture
        .service
        .list_sessions(&owner.access_token)
        .await
        .unwrap();
    let session_id = sessions[0].id;

    // the intruder sees not-found, the owner's session survives
    let err = fixture
        .service
        .revoke_session(&intruder.access_token, session_id, &ClientMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));
    assert_eq!(err.status(), 404);
    assert_eq!(
        fixture
            .service
            .list_sessions(&owner.access_token)
            .await
            .unwrap()
            .len(),
        1
    );

    fixture
        .service
        .revoke_session(&owner.access_token, session_id, &ClientMeta::default())
        .await
        .unwrap();
    assert!(fixture
        .service
        .list_sessions(&owner.access_token)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_admin_profile_serializes_the_wildcard() {
    let fixture = setup();
    let role = test_role("admin", &[]);
    let role_id = role.role.id;
    fixture.store.insert_role(role);
    fixture.store.insert_user(test_user("A1", "Secreta1", Some(role_id)));

    let admitted = login(&fixture, "A1", "Secreta1").await.unwrap();
    assert_eq!(admitted.user.permissions, vec!["*"]);

    let profile = fixture
        .service
        .current_user(&admitted.access_token)
        .await
        .unwrap();
    assert_eq!(profile.permissions, vec!["*"]);
    assert_eq!(profile.role.as_ref().map(|r| r.name.as_str()), Some("admin"));
}

#[tokio::test]
async fn test_permission_guard() {
    let fixture = setup();

    let operador = test_role("operador", &["protocolos.ver"]);
    let operador_id = operador.role.id;
    fixture.store.insert_role(operador);

    let admin = test_role("superadmin", &[]);
    let admin_id = admin.role.id;
    fixture.store.insert_role(admin);

    fixture.store.insert_user(test_user("A1", "Secreta1", Some(operador_id)));
    fixture.store.insert_user(test_user("B2", "Secreta1", Some(admin_id)));
    fixture.store.insert_user(test_user("C3", "Secreta1", None));

    let operador = login(&fixture, "A1", "Secreta1").await.unwrap();
    let admin = login(&fixture, "B2", "Secreta1").await.unwrap();
    let sin_rol = login(&fixture, "C3", "Secreta1").await.unwrap();

    // explicit set member passes
    guard::require_permission(&fixture.service, &operador.access_token, "protocolos.ver")
        .await
        .unwrap();

    // missing permission fails with the specific reason
    let err =
        guard::require_permission(&fixture.service, &operador.access_token, "protocolos.crear")
            .await
            .unwrap_err();
    assert!(matches!(err, AuthError::InsufficientPermissions(_)));
    assert_eq!(err.status(), 403);

    // admin tier passes everything
    guard::require_permission(&fixture.service, &admin.access_token, "protocolos.crear")
        .await
        .unwrap();

    // no role means no permissions
    assert!(guard::require_permission(
        &fixture.service,
        &sin_rol.access_token,
        "protocolos.ver"
    )
    .await
    .is_err());

    // garbage bearer token is an invalid-token failure
    let err = guard::require_user(&fixture.service, "no-es-un-token")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));

    // a gate bound at registration time behaves the same way
    let gate = PermissionGuard::new(fixture.service.clone(), "protocolos.ver");
    assert_eq!(gate.permission(), "protocolos.ver");
    gate.check(&operador.access_token).await.unwrap();
    assert!(gate.check(&sin_rol.access_token).await.is_err());
}
