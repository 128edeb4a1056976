pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::store::models::{Role, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("token generation failed: {0}")]
    TokenGeneration(String),
    #[error("user row is missing the scope its role requires")]
    InconsistentScope,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

/// The authenticated identity. One variant per role, each carrying exactly
/// the scope ids that role requires, so a missing required scope cannot be
/// represented once a `Principal` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    CompanyAdmin { user_id: Uuid },
    InstitutionAdmin { user_id: Uuid, institution_id: Uuid },
    BranchAdmin { user_id: Uuid, institution_id: Uuid, branch_id: Uuid },
    Staff { user_id: Uuid, institution_id: Uuid, branch_id: Uuid },
    /// Scoped to exactly one student; carries no cross-student access.
    Parent { student_id: Uuid },
}

impl Principal {
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        match claims.role {
            Role::CompanyAdmin => Ok(Principal::CompanyAdmin { user_id: claims.sub }),
            Role::InstitutionAdmin => Ok(Principal::InstitutionAdmin {
                user_id: claims.sub,
                institution_id: claims.institution_id.ok_or(AuthError::InconsistentScope)?,
            }),
            Role::BranchAdmin => Ok(Principal::BranchAdmin {
                user_id: claims.sub,
                institution_id: claims.institution_id.ok_or(AuthError::InconsistentScope)?,
                branch_id: claims.branch_id.ok_or(AuthError::InconsistentScope)?,
            }),
            Role::Staff => Ok(Principal::Staff {
                user_id: claims.sub,
                institution_id: claims.institution_id.ok_or(AuthError::InconsistentScope)?,
                branch_id: claims.branch_id.ok_or(AuthError::InconsistentScope)?,
            }),
            Role::Parent => Ok(Principal::Parent {
                student_id: claims.student_id.ok_or(AuthError::InconsistentScope)?,
            }),
        }
    }

    /// Build a principal from a stored user row, rejecting rows whose role
    /// requires a scope id that is absent.
    pub fn from_user(user: &User) -> Result<Self, AuthError> {
        match user.role {
            Role::CompanyAdmin => Ok(Principal::CompanyAdmin { user_id: user.id }),
            Role::InstitutionAdmin => Ok(Principal::InstitutionAdmin {
                user_id: user.id,
                institution_id: user.institution_id.ok_or(AuthError::InconsistentScope)?,
            }),
            Role::BranchAdmin => Ok(Principal::BranchAdmin {
                user_id: user.id,
                institution_id: user.institution_id.ok_or(AuthError::InconsistentScope)?,
                branch_id: user.branch_id.ok_or(AuthError::InconsistentScope)?,
            }),
            Role::Staff => Ok(Principal::Staff {
                user_id: user.id,
                institution_id: user.institution_id.ok_or(AuthError::InconsistentScope)?,
                branch_id: user.branch_id.ok_or(AuthError::InconsistentScope)?,
            }),
            // Parents never have user rows; their principal comes from the
            // verification flow.
            Role::Parent => Err(AuthError::InconsistentScope),
        }
    }

    pub fn to_claims(&self, expiry_hours: u64) -> Claims {
        let now = Utc::now();
        let (sub, role, institution_id, branch_id, student_id) = match self {
            Principal::CompanyAdmin { user_id } => {
                (*user_id, Role::CompanyAdmin, None, None, None)
            }
            Principal::InstitutionAdmin { user_id, institution_id } => {
                (*user_id, Role::InstitutionAdmin, Some(*institution_id), None, None)
            }
            Principal::BranchAdmin { user_id, institution_id, branch_id } => (
                *user_id,
                Role::BranchAdmin,
                Some(*institution_id),
                Some(*branch_id),
                None,
            ),
            Principal::Staff { user_id, institution_id, branch_id } => {
                (*user_id, Role::Staff, Some(*institution_id), Some(*branch_id), None)
            }
            Principal::Parent { student_id } => {
                (*student_id, Role::Parent, None, None, Some(*student_id))
            }
        };
        Claims {
            sub,
            role,
            institution_id,
            branch_id,
            student_id,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn issue_token(principal: &Principal, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let claims = principal.to_claims(security.jwt_expiry_hours);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn verify_token(token: &str, security: &SecurityConfig) -> Result<Principal, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(security.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;
    Principal::from_claims(&data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "test-secret".into(),
            jwt_expiry_hours: 1,
            cors_origins: vec![],
            bcrypt_cost: 4,
        }
    }

    #[test]
    fn token_round_trip_preserves_principal() {
        let principal = Principal::BranchAdmin {
            user_id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let token = issue_token(&principal, &security()).unwrap();
        let verified = verify_token(&token, &security()).unwrap();
        assert_eq!(verified, principal);
    }

    #[test]
    fn parent_token_is_scoped_to_one_student() {
        let student_id = Uuid::new_v4();
        let token = issue_token(&Principal::Parent { student_id }, &security()).unwrap();
        match verify_token(&token, &security()).unwrap() {
            Principal::Parent { student_id: got } => assert_eq!(got, student_id),
            other => panic!("unexpected principal: {:?}", other),
        }
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = issue_token(
            &Principal::CompanyAdmin { user_id: Uuid::new_v4() },
            &security(),
        )
        .unwrap();
        let mut other = security();
        other.jwt_secret = "different-secret".into();
        assert!(matches!(verify_token(&token, &other), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn claims_missing_required_scope_are_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::BranchAdmin,
            institution_id: Some(Uuid::new_v4()),
            branch_id: None,
            student_id: None,
            exp: 0,
            iat: 0,
        };
        assert!(matches!(
            Principal::from_claims(&claims),
            Err(AuthError::InconsistentScope)
        ));
    }
}
