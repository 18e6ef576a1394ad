use crate::{
    api::{Violation, violation},
    auth::{
        auth::AuthUser,
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::role::Role,
    models::{Claims, LoginReqDto, TokenPair, TokenType, UserReq, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issue an access/refresh pair and persist the refresh token id.
async fn issue_tokens(
    subject: &Subject<'_>,
    pool: &MySqlPool,
    config: &Config,
) -> Result<TokenPair, HttpResponse> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl).map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            HttpResponse::InternalServerError().finish()
        })?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                HttpResponse::InternalServerError().finish()
            },
        )?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to store refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Create a login (admin only)
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register(
    auth: AuthUser,
    user: web::Json<UserReq>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username and password must not be empty"
        })));
    }

    let role = match Role::from_id(user.role_id) {
        Some(role) => role,
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Invalid role_id. Allowed: 1 (admin), 2 (manager), 3 (employee)"
            })));
        }
    };

    if role == Role::Employee && user.employee_id.is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Employee logins must be linked to an employee_id"
        })));
    }

    let hashed = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        r#"INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&username)
    .bind(hashed)
    .bind(role.id())
    .bind(user.employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(username = %username, ?role, created_by = auth.user_id, "User registered");
            Ok(HttpResponse::Created().json(json!({
                "message": "User registered successfully"
            })))
        }
        Err(e) if violation(&e) == Some(Violation::Duplicate) => {
            Ok(HttpResponse::Conflict().json(json!({
                "message": "Username already exists"
            })))
        }
        Err(e) if violation(&e) == Some(Violation::MissingReference) => {
            Ok(HttpResponse::BadRequest().json(json!({
                "message": "Unknown employee_id"
            })))
        }
        Err(e) => {
            error!(error = %e, "Failed to register user");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().json(json!({"message": "Username or password required"}));
    }

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            info!("Invalid credentials: user not found or inactive");
            return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
    }

    let subject = Subject {
        user_id: db_user.id,
        username: &db_user.username,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };

    let tokens = match issue_tokens(&subject, pool.get_ref(), &config).await {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    // last_login_at is informational only
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    HttpResponse::Ok().json(tokens)
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let claims = verify_token(bearer(req)?, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Rotate a refresh token: the presented one is revoked, a new pair is issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid, revoked or expired refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match refresh_claims(&req, &config) {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };

    // Revoking with a status guard makes concurrent refreshes single-use
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await;

    match revoked {
        Ok(r) if r.rows_affected() == 1 => {}
        Ok(_) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let subject = Subject {
        user_id: claims.user_id,
        username: &claims.sub,
        role: claims.role,
        employee_id: claims.employee_id,
    };

    match issue_tokens(&subject, pool.get_ref(), &config).await {
        Ok(tokens) => HttpResponse::Ok().json(tokens),
        Err(resp) => resp,
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    // only refresh tokens can log out
    if let Some(claims) = refresh_claims(&req, &config) {
        if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(&claims.jti)
            .execute(pool.get_ref())
            .await
        {
            error!(error = %e, "Failed to revoke refresh token on logout");
        }
    }

    HttpResponse::NoContent().finish()
}
