use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use shared::password::hash_password;
use shared::{ApiError, User, UserPayload};

use crate::middleware::AuthUser;
use crate::models::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(all_users))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::patch().to(update_user))
            .route("/{id}", web::put().to(insert_user))
            .route("/{id}", web::delete().to(delete_user))
    );
}

/// Path ids must be positive integers
fn parse_user_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn invalid_id() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new("invalid_id", "Invalid user ID"))
}

fn id_mismatch(path_id: i64, payload: &UserPayload) -> bool {
    payload.id.is_some_and(|id| id != path_id)
}

async fn all_users(_auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.list_users().await {
        Ok(users) => Ok(HttpResponse::Ok().json(users)),
        Err(e) => {
            log::error!("Error listing users: {}", e);
            Ok(HttpResponse::BadRequest().json(ApiError::new("store_error", "Failed to list users")))
        }
    }
}

async fn get_user(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let Some(user_id) = parse_user_id(&path.into_inner()) else {
        return Ok(invalid_id());
    };

    match state.store.get_user(user_id).await {
        Ok(user) => Ok(HttpResponse::Ok().json(user)),
        Err(e) => {
            log::warn!("Error fetching user {}: {}", user_id, e);
            Ok(HttpResponse::BadRequest().json(ApiError::new("not_found", e.to_string())))
        }
    }
}

async fn update_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UserPayload>,
) -> Result<HttpResponse> {
    let Some(user_id) = parse_user_id(&path.into_inner()) else {
        return Ok(invalid_id());
    };

    let payload = body.into_inner();
    if id_mismatch(user_id, &payload) {
        return Ok(HttpResponse::BadRequest().json(ApiError::new(
            "id_mismatch",
            "User ID in body does not match the URL",
        )));
    }

    let mut user = match state.store.get_user(user_id).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("Error fetching user {} for update: {}", user_id, e);
            return Ok(HttpResponse::BadRequest().json(ApiError::new("not_found", e.to_string())));
        }
    };

    user.first_name = payload.first_name;
    user.last_name = payload.last_name;
    user.email = payload.email;

    if let Err(e) = state.store.update_user(&user).await {
        log::warn!("Error updating user {}: {}", user_id, e);
        return Ok(HttpResponse::BadRequest().json(ApiError::new("update_error", e.to_string())));
    }

    if let Some(password) = payload.password {
        let password_hash = match hash_password(&password) {
            Ok(hash) => hash,
            Err(e) => {
                log::error!("Password hashing failed for user {}: {}", user_id, e);
                return Ok(HttpResponse::InternalServerError().json(ApiError::new(
                    "internal_error",
                    "Failed to store password",
                )));
            }
        };

        if let Err(e) = state.store.reset_password(user_id, &password_hash).await {
            log::warn!("Error resetting password for user {}: {}", user_id, e);
            return Ok(HttpResponse::BadRequest().json(ApiError::new("update_error", e.to_string())));
        }
    }

    log::info!("User {} updated by {}", user_id, auth.0.sub);
    Ok(HttpResponse::NoContent().finish())
}

/// Creates a new user; the store assigns the id
async fn insert_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UserPayload>,
) -> Result<HttpResponse> {
    let Some(user_id) = parse_user_id(&path.into_inner()) else {
        return Ok(invalid_id());
    };

    let payload = body.into_inner();
    if id_mismatch(user_id, &payload) {
        return Ok(HttpResponse::BadRequest().json(ApiError::new(
            "id_mismatch",
            "User ID in body does not match the URL",
        )));
    }

    let password_hash = match payload.password.as_deref().map(hash_password).transpose() {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("Password hashing failed: {}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiError::new(
                "internal_error",
                "Failed to store password",
            )));
        }
    };

    let now = Utc::now();
    let user = User {
        id: 0,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password_hash,
        last_login: None,
        created_at: now,
        updated_at: now,
    };

    match state.store.insert_user(&user).await {
        Ok(new_id) => {
            log::info!("User {} created by {}", new_id, auth.0.sub);
            Ok(HttpResponse::NoContent().finish())
        }
        Err(e) => {
            log::warn!("Error inserting user {}: {}", user.email, e);
            Ok(HttpResponse::BadRequest().json(ApiError::new("insert_error", e.to_string())))
        }
    }
}

async fn delete_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let Some(user_id) = parse_user_id(&path.into_inner()) else {
        return Ok(invalid_id());
    };

    match state.store.delete_user(user_id).await {
        Ok(()) => {
            log::info!("User {} deleted by {}", user_id, auth.0.sub);
            Ok(HttpResponse::NoContent().finish())
        }
        Err(e) => {
            log::warn!("Error deleting user {}: {}", user_id, e);
            Ok(HttpResponse::BadRequest().json(ApiError::new("delete_error", e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure_routes;
    use crate::test_support::{admin_user, app_state, bearer, token_service};
    use actix_web::{http::header::ContentType, http::Method, test, App};
    use chrono::Duration;
    use shared::password::verify_password;

    #[::core::prelude::v1::test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("1"), Some(1));
        assert_eq!(parse_user_id("x"), None);
        assert_eq!(parse_user_id("1y"), None);
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("-3"), None);
        assert_eq!(parse_user_id("99999999999999999999"), None);
    }

    #[actix_web::test]
    async fn test_user_handlers() {
        let cases = [
            ("allUsers", Method::GET, "/users", "", 200),
            ("deleteUser", Method::DELETE, "/users/1", "", 204),
            ("deleteUser bad url param", Method::DELETE, "/users/x", "", 400),
            ("deleteUser unknown", Method::DELETE, "/users/100", "", 400),
            ("get user valid", Method::GET, "/users/1", "", 200),
            ("get user invalid", Method::GET, "/users/100", "", 400),
            ("get user bad url param", Method::GET, "/users/1y", "", 400),
            (
                "update user valid",
                Method::PATCH,
                "/users/1",
                r#"{"id": 1, "first_name": "Administrator", "last_name": "User", "email": "admin@example.com"}"#,
                204,
            ),
            (
                "update user invalid",
                Method::PATCH,
                "/users/1",
                r#"{"id": 20, "first_name": "Administrator", "last_name": "User", "email": "admin@example.com"}"#,
                400,
            ),
            (
                "update user invalid JSON",
                Method::PATCH,
                "/users/1",
                r#"{"id": 1, first_name: "Administrator", "last_name": "User", "email": "admin@example.com"}"#,
                400,
            ),
            (
                "insert user valid",
                Method::PUT,
                "/users/1",
                r#"{"id": 1, "first_name": "Jack", "last_name": "User", "email": "jack@example.com"}"#,
                204,
            ),
            (
                "insert user invalid",
                Method::PUT,
                "/users/1",
                r#"{"id": 1, "foo": "bar", "first_name": "Jack", "last_name": "User", "email": "jack@example.com"}"#,
                400,
            ),
            (
                "insert user invalid JSON",
                Method::PUT,
                "/users/1",
                r#"{"id": 1, first_name: "Jack", "last_name": "User", "email": "jack@example.com"}"#,
                400,
            ),
            (
                "insert user id mismatch",
                Method::PUT,
                "/users/1",
                r#"{"id": 2, "first_name": "Jack", "last_name": "User", "email": "jack@example.com"}"#,
                400,
            ),
            (
                "insert user duplicate email",
                Method::PUT,
                "/users/1",
                r#"{"id": 1, "first_name": "Jack", "last_name": "User", "email": "admin@example.com"}"#,
                400,
            ),
        ];

        for (name, method, uri, json, expected) in cases {
            // Fresh state per case so deletes and inserts do not leak between rows
            let app = test::init_service(App::new().app_data(app_state()).configure(configure_routes)).await;

            let mut req = test::TestRequest::default()
                .method(method)
                .uri(uri)
                .insert_header(bearer());
            if !json.is_empty() {
                req = req.insert_header(ContentType::json()).set_payload(json);
            }

            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status().as_u16(), expected, "{}", name);
        }
    }

    #[actix_web::test]
    async fn test_users_require_bearer_token() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure_routes)).await;
        let tokens = token_service();
        let expired = tokens
            .generate_token_pair_at(&admin_user(), Utc::now() - Duration::hours(1))
            .unwrap();
        let fresh = tokens.generate_token_pair(&admin_user()).unwrap();

        let cases = [
            ("no header", None, "unauthorized"),
            ("wrong scheme", Some(format!("Token {}", fresh.access_token)), "unauthorized"),
            ("refresh token", Some(format!("Bearer {}", fresh.refresh_token)), "unauthorized"),
            ("expired", Some(format!("Bearer {}", expired.access_token)), "token_expired"),
        ];

        for (name, header, error) in cases {
            let mut req = test::TestRequest::get().uri("/users");
            if let Some(value) = header {
                req = req.insert_header(("Authorization", value));
            }
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status().as_u16(), 401, "{}", name);

            let body: ApiError = test::read_body_json(resp).await;
            assert_eq!(body.error, error, "{}", name);
        }
    }

    #[actix_web::test]
    async fn test_all_users_hides_password_hash() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/users")
            .insert_header(bearer())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("admin@example.com"));
        assert!(!text.contains("password"));
        assert!(!text.contains("argon2"));
    }

    #[actix_web::test]
    async fn test_update_user_resets_password() {
        let state = app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::patch()
            .uri("/users/1")
            .insert_header(bearer())
            .insert_header(ContentType::json())
            .set_payload(r#"{"first_name": "Administrator", "last_name": "User", "email": "admin@example.com", "password": "new-secret"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 204);

        let user = state.store.get_user(1).await.unwrap();
        assert_eq!(user.first_name, "Administrator");
        let hash = user.password_hash.unwrap();
        assert!(verify_password("new-secret", &hash).unwrap());
    }

    #[actix_web::test]
    async fn test_insert_user_assigns_id() {
        let state = app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::put()
            .uri("/users/1")
            .insert_header(bearer())
            .insert_header(ContentType::json())
            .set_payload(r#"{"first_name": "Jack", "last_name": "User", "email": "jack@example.com", "password": "pw"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 204);

        let jack = state.store.get_user_by_email("jack@example.com").await.unwrap();
        assert_eq!(jack.id, 2);
        assert!(verify_password("pw", jack.password_hash.as_deref().unwrap()).unwrap());
    }
}
