use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use crate::workflow::status::ActorRole;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorForbidden,
    error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, actix_web::Error> {
    // Set by the auth middleware on protected scopes
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorUnauthorized("Missing token"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Config missing"))?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ErrorUnauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Access {
        return Err(ErrorUnauthorized("Access token required"));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ErrorUnauthorized("Invalid role"))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ErrorForbidden("Admin only"))
        }
    }

    pub fn require_approver(&self) -> actix_web::Result<()> {
        if self.is_approver() {
            Ok(())
        } else {
            Err(ErrorForbidden("Manager/Admin only"))
        }
    }

    pub fn is_approver(&self) -> bool {
        self.actor_role() == ActorRole::Approver
    }

    pub fn actor_role(&self) -> ActorRole {
        self.role.actor_role()
    }

    /// Employee profile of the caller, required for self-service actions.
    pub fn require_employee_profile(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }

    /// Approvers see everything; employees only rows for their own profile.
    pub fn can_access_employee(&self, employee_id: u64) -> bool {
        self.is_approver() || self.employee_id == Some(employee_id)
    }

    /// Restricts list queries: `Some(id)` for employees, `None` for approvers.
    pub fn visibility_scope(&self) -> actix_web::Result<Option<u64>> {
        if self.is_approver() {
            Ok(None)
        } else {
            self.require_employee_profile().map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token, generate_refresh_token};
    use crate::config::test_config;
    use actix_web::test::TestRequest;

    fn token(role: u8, refresh: bool) -> String {
        let config = test_config();
        let subject = Subject {
            user_id: 9,
            username: "lan.tran",
            role,
            employee_id: Some(4),
        };
        if refresh {
            generate_refresh_token(&subject, &config.jwt_secret, 60).unwrap().0
        } else {
            generate_access_token(&subject, &config.jwt_secret, 60).unwrap()
        }
    }

    async fn extract(header: Option<String>) -> Result<AuthUser, actix_web::Error> {
        let mut req = TestRequest::default().app_data(Data::new(test_config()));
        if let Some(h) = header {
            req = req.insert_header(("Authorization", h));
        }
        let (req, mut payload) = req.to_http_parts();
        AuthUser::from_request(&req, &mut payload).await
    }

    #[actix_web::test]
    async fn extracts_employee_from_access_token() {
        let user = extract(Some(format!("Bearer {}", token(3, false)))).await.unwrap();
        assert_eq!(user.user_id, 9);
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.actor_role(), ActorRole::Employee);
        assert_eq!(user.visibility_scope().unwrap(), Some(4));
        assert!(user.can_access_employee(4));
        assert!(!user.can_access_employee(5));
        assert!(user.require_approver().is_err());
    }

    #[actix_web::test]
    async fn manager_is_approver() {
        let user = extract(Some(format!("Bearer {}", token(2, false)))).await.unwrap();
        assert!(user.is_approver());
        assert_eq!(user.visibility_scope().unwrap(), None);
        assert!(user.require_admin().is_err());
    }

    #[actix_web::test]
    async fn rejects_missing_refresh_and_unknown_role() {
        assert!(extract(None).await.is_err());
        assert!(extract(Some(format!("Bearer {}", token(3, true)))).await.is_err());
        assert!(extract(Some(format!("Bearer {}", token(9, false)))).await.is_err());
        assert!(extract(Some("Basic abc".to_string())).await.is_err());
    }
}
