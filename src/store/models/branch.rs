use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub branch_name: String,
    pub address: Option<String>,
    pub location: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub contact_phone: Option<String>,
    /// Class labels offered at this branch, e.g. ["LKG", "UKG", "1st Std"].
    #[serde(default)]
    pub classes: Vec<String>,
    /// Per-class fee table in its configured text form,
    /// e.g. "LKG:20000, UKG:21000, 1st Std:25000".
    pub fees_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    pub institution_id: Uuid,
    pub branch_name: String,
    pub address: Option<String>,
    pub location: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    pub fees_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchUpdate {
    pub branch_name: Option<String>,
    pub address: Option<String>,
    pub location: Option<String>,
    pub manager_name: Option<String>,
    pub manager_email: Option<String>,
    pub contact_phone: Option<String>,
    pub classes: Option<Vec<String>>,
    pub fees_text: Option<String>,
}

impl Branch {
    pub fn new(input: NewBranch) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            institution_id: input.institution_id,
            branch_name: input.branch_name,
            address: input.address,
            location: input.location,
            manager_name: input.manager_name,
            manager_email: input.manager_email,
            contact_phone: input.contact_phone,
            classes: input.classes,
            fees_text: input.fees_text,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: BranchUpdate) {
        if let Some(v) = update.branch_name {
            self.branch_name = v;
        }
        if let Some(v) = update.address {
            self.address = Some(v);
        }
        if let Some(v) = update.location {
            self.location = Some(v);
        }
        if let Some(v) = update.manager_name {
            self.manager_name = Some(v);
        }
        if let Some(v) = update.manager_email {
            self.manager_email = Some(v);
        }
        if let Some(v) = update.contact_phone {
            self.contact_phone = Some(v);
        }
        if let Some(v) = update.classes {
            self.classes = v;
        }
        if let Some(v) = update.fees_text {
            self.fees_text = Some(v);
        }
        self.updated_at = Utc::now();
    }

    /// Parse `fees_text` into an ordered class -> amount table.
    /// Malformed entries are skipped rather than failing the whole table.
    pub fn fee_table(&self) -> Vec<(String, i64)> {
        let Some(text) = &self.fees_text else {
            return Vec::new();
        };
        text.split(',')
            .filter_map(|entry| {
                let (class, amount) = entry.split_once(':')?;
                let class = class.trim();
                let amount: i64 = amount.trim().parse().ok()?;
                if class.is_empty() {
                    return None;
                }
                Some((class.to_string(), amount))
            })
            .collect()
    }
}
