use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Left,
    Transferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSubject {
    pub name: String,
    pub marks: i32,
    pub total_marks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub subjects: Vec<ExamSubject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub present_days: i32,
    pub total_days: i32,
}

impl Attendance {
    pub fn percentage(&self) -> f64 {
        if self.total_days <= 0 {
            return 0.0;
        }
        (self.present_days as f64 / self.total_days as f64) * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub class: String,
    pub section: Option<String>,
    pub roll_no: Option<String>,
    pub parent_name: Option<String>,
    pub phone_no: Option<String>,
    pub address: Option<String>,
    /// Unique within the owning institution.
    pub admission_number: String,
    pub academic_year: Option<String>,
    pub status: StudentStatus,
    #[serde(default)]
    pub exams: Vec<Exam>,
    pub attendance: Option<Attendance>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub branch_id: Uuid,
    pub name: String,
    pub class: String,
    pub section: Option<String>,
    pub roll_no: Option<String>,
    pub parent_name: Option<String>,
    pub phone_no: Option<String>,
    pub address: Option<String>,
    pub admission_number: String,
    pub academic_year: Option<String>,
    #[serde(default = "default_status")]
    pub status: StudentStatus,
}

fn default_status() -> StudentStatus {
    StudentStatus::Active
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub class: Option<String>,
    pub section: Option<String>,
    pub roll_no: Option<String>,
    pub parent_name: Option<String>,
    pub phone_no: Option<String>,
    pub address: Option<String>,
    pub academic_year: Option<String>,
    pub status: Option<StudentStatus>,
}

impl Student {
    /// `institution_id` is copied from the owning branch, never taken from
    /// client input.
    pub fn new(input: NewStudent, institution_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            institution_id,
            branch_id: input.branch_id,
            name: input.name,
            class: input.class,
            section: input.section,
            roll_no: input.roll_no,
            parent_name: input.parent_name,
            phone_no: input.phone_no,
            address: input.address,
            admission_number: input.admission_number,
            academic_year: input.academic_year,
            status: input.status,
            exams: Vec::new(),
            attendance: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: StudentUpdate) {
        if let Some(v) = update.name {
            self.name = v;
        }
        if let Some(v) = update.class {
            self.class = v;
        }
        if let Some(v) = update.section {
            self.section = Some(v);
        }
        if let Some(v) = update.roll_no {
            self.roll_no = Some(v);
        }
        if let Some(v) = update.parent_name {
            self.parent_name = Some(v);
        }
        if let Some(v) = update.phone_no {
            self.phone_no = Some(v);
        }
        if let Some(v) = update.address {
            self.address = Some(v);
        }
        if let Some(v) = update.academic_year {
            self.academic_year = Some(v);
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        self.updated_at = Utc::now();
    }
}
