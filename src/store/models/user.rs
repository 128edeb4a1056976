use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed role set. `super_admin` appears in legacy seed rows as drift for
/// `company_admin`; it is accepted on input and never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "super_admin")]
    CompanyAdmin,
    InstitutionAdmin,
    BranchAdmin,
    Staff,
    Parent,
}

impl Role {
    pub fn requires_institution(&self) -> bool {
        matches!(self, Role::InstitutionAdmin | Role::BranchAdmin | Role::Staff)
    }

    pub fn requires_branch(&self) -> bool {
        matches!(self, Role::BranchAdmin | Role::Staff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Unique across the system.
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub institution_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub staff_category: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub staff_category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub institution_id: Option<Uuid>,
    pub status: Option<UserStatus>,
    pub staff_category: Option<String>,
}

impl NewUser {
    /// Roles imply required scope ids; reject creation where one is absent.
    pub fn validate_scope(&self) -> Result<(), String> {
        if self.role.requires_institution() && self.institution_id.is_none() {
            return Err(format!(
                "role '{}' requires an institution_id",
                role_label(self.role)
            ));
        }
        if self.role.requires_branch() && self.branch_id.is_none() {
            return Err(format!("role '{}' requires a branch_id", role_label(self.role)));
        }
        Ok(())
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::CompanyAdmin => "company_admin",
        Role::InstitutionAdmin => "institution_admin",
        Role::BranchAdmin => "branch_admin",
        Role::Staff => "staff",
        Role::Parent => "parent",
    }
}

impl User {
    pub fn new(input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            role: input.role,
            status: UserStatus::Active,
            institution_id: input.institution_id,
            branch_id: input.branch_id,
            staff_category: input.staff_category,
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(v) = update.name {
            self.name = v;
        }
        if let Some(v) = update.email {
            self.email = v;
        }
        if let Some(v) = update.phone {
            self.phone = Some(v);
        }
        if let Some(v) = update.institution_id {
            self.institution_id = Some(v);
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = update.staff_category {
            self.staff_category = Some(v);
        }
        self.updated_at = Utc::now();
    }
}
