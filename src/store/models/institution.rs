use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    /// External institution code, e.g. "INST001". Unique across the system.
    pub code: String,
    pub location: Option<String>,
    pub logo: Option<String>,
    pub max_branches: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInstitution {
    pub name: String,
    pub code: String,
    pub location: Option<String>,
    pub logo: Option<String>,
    #[serde(default = "default_max_branches")]
    pub max_branches: i32,
}

fn default_max_branches() -> i32 {
    10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub logo: Option<String>,
    pub max_branches: Option<i32>,
}

impl Institution {
    pub fn new(input: NewInstitution) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            code: input.code,
            location: input.location,
            logo: input.logo,
            max_branches: input.max_branches,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: InstitutionUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
        if let Some(logo) = update.logo {
            self.logo = Some(logo);
        }
        if let Some(max_branches) = update.max_branches {
            self.max_branches = max_branches;
        }
        self.updated_at = Utc::now();
    }
}
