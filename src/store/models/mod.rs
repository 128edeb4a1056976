pub mod branch;
pub mod bus;
pub mod fee;
pub mod institution;
pub mod inventory;
pub mod student;
pub mod user;

pub use branch::{Branch, BranchUpdate, NewBranch};
pub use bus::{
    AssignmentStatus, Availability, Bus, BusCondition, BusUpdate, DriverInfo, MaintenanceInfo,
    NewBus, OperationalStatus, RouteInfo, SafetyInfo, StatusUpdate,
};
pub use fee::{FeePayment, NewFeePayment};
pub use institution::{Institution, InstitutionUpdate, NewInstitution};
pub use inventory::{InventoryItem, NewInventoryItem, NewPurchaseEntry, PurchaseEntry};
pub use student::{Attendance, Exam, ExamSubject, NewStudent, Student, StudentStatus, StudentUpdate};
pub use user::{NewUser, Role, User, UserStatus, UserUpdate};

/// Name comparison used for parent verification and payment matching:
/// whitespace-trimmed, case-insensitive.
pub fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_name_trims_and_lowercases() {
        assert_eq!(normalized_name("  Rahul Sharma "), "rahul sharma");
        assert_eq!(normalized_name("RAHUL SHARMA"), "rahul sharma");
    }
}
