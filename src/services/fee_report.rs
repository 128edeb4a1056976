//! Per-student fee rollup: the branch's configured fee table matched to the
//! student's class, against the sum of recorded payments.

use serde::Serialize;

use crate::store::models::{Branch, FeePayment, Student};

#[derive(Debug, Clone, Serialize)]
pub struct FeeLine {
    pub class: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeeReport {
    pub student_name: String,
    pub class: String,
    pub fee_structure: Vec<FeeLine>,
    pub fee_structure_total: i64,
    pub paid_total: i64,
    /// Never negative; overpayment clamps to zero.
    pub pending_amount: i64,
}

pub fn fee_report(student: &Student, branch: &Branch, payments: &[FeePayment]) -> FeeReport {
    let fee_structure: Vec<FeeLine> = branch
        .fee_table()
        .into_iter()
        .filter(|(class, _)| class_matches(&student.class, class))
        .map(|(class, amount)| FeeLine { class, amount })
        .collect();

    let fee_structure_total: i64 = fee_structure.iter().map(|line| line.amount).sum();
    let paid_total: i64 = payments.iter().map(|p| p.amount).sum();

    FeeReport {
        student_name: student.name.clone(),
        class: student.class.clone(),
        fee_structure,
        fee_structure_total,
        paid_total,
        pending_amount: (fee_structure_total - paid_total).max(0),
    }
}

/// Class labels match case-insensitively, or by equal leading integers so
/// that a student recorded as class "1" matches the fee entry "1st Std".
fn class_matches(student_class: &str, fee_class: &str) -> bool {
    let a = student_class.trim();
    let b = fee_class.trim();
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    match (leading_int(a), leading_int(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn leading_int(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
