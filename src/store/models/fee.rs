use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeePayment {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub branch_id: Uuid,
    /// Payments are matched to students by normalized name within the
    /// branch; the source data carries no student id on payments.
    pub student_name: String,
    /// Whole currency units. Always positive.
    pub amount: i64,
    pub date: DateTime<Utc>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeePayment {
    pub branch_id: Uuid,
    pub student_name: String,
    pub amount: i64,
    pub date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub note: Option<String>,
}

impl FeePayment {
    pub fn new(input: NewFeePayment, institution_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id,
            branch_id: input.branch_id,
            student_name: input.student_name,
            amount: input.amount,
            date: input.date.unwrap_or_else(Utc::now),
            category: input.category,
            mode: input.mode,
            note: input.note,
        }
    }
}
