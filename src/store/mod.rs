pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use models::{
    Branch, BranchUpdate, Bus, BusUpdate, DriverInfo, FeePayment, Institution, InstitutionUpdate,
    InventoryItem, MaintenanceInfo, NewBranch, NewBus, NewFeePayment, NewInstitution,
    NewInventoryItem, NewPurchaseEntry, NewStudent, NewUser, PurchaseEntry, RouteInfo, SafetyInfo,
    StatusUpdate, Student, StudentUpdate, User, UserUpdate, Attendance, Exam,
};

/// Errors from the storage layer. Uniqueness violations surface here as
/// `Duplicate` from the store's own constraint, never from a pre-read.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("branch limit reached for this institution")]
    BranchLimit,

    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("record was modified concurrently")]
    StaleStatus,

    #[error("storage timeout")]
    Timeout,

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn duplicate(what: impl Into<String>) -> Self {
        StoreError::Duplicate(what.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Dependent records surviving a hard delete of their scope entity.
/// Hard deletes do not cascade; callers log what was left behind.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Orphans {
    pub branches: u64,
    pub students: u64,
    pub buses: u64,
    pub fee_payments: u64,
    pub users: u64,
    pub inventory_items: u64,
}

impl Orphans {
    pub fn total(&self) -> u64 {
        self.branches + self.students + self.buses + self.fee_payments + self.users
            + self.inventory_items
    }
}

/// Counts backing the company dashboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DashboardTotals {
    pub institutions: u64,
    pub branches: u64,
    pub students: u64,
    pub fee_collected: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BranchSummary {
    pub id: Uuid,
    pub name: String,
    pub institution_name: String,
}

/// Storage seam. One handle is constructed at startup and injected into
/// every handler through app state; implementations are `PgStore` and the
/// in-memory `MemStore`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Institutions
    async fn create_institution(&self, input: NewInstitution) -> StoreResult<Institution>;
    async fn list_institutions(&self) -> StoreResult<Vec<Institution>>;
    async fn get_institution(&self, id: Uuid) -> StoreResult<Institution>;
    async fn update_institution(&self, id: Uuid, update: InstitutionUpdate)
        -> StoreResult<Institution>;
    /// Hard delete. Returns surviving dependents (no cascade).
    async fn delete_institution(&self, id: Uuid) -> StoreResult<Orphans>;

    // Branches
    async fn create_branch(&self, input: NewBranch) -> StoreResult<Branch>;
    async fn get_branch(&self, id: Uuid) -> StoreResult<Branch>;
    async fn update_branch(&self, id: Uuid, update: BranchUpdate) -> StoreResult<Branch>;
    async fn delete_branch(&self, id: Uuid) -> StoreResult<Orphans>;
    async fn list_branches(&self, institution_id: Uuid) -> StoreResult<Vec<Branch>>;

    // Students
    async fn create_student(&self, input: NewStudent) -> StoreResult<Student>;
    async fn get_student(&self, id: Uuid) -> StoreResult<Student>;
    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> StoreResult<Student>;
    async fn list_students(&self, branch_id: Uuid) -> StoreResult<Vec<Student>>;
    async fn add_exam(&self, student_id: Uuid, exam: Exam) -> StoreResult<Student>;
    async fn set_attendance(&self, student_id: Uuid, attendance: Attendance)
        -> StoreResult<Student>;
    /// Parent verification lookup: normalized-name match plus exact phone.
    async fn find_student_by_name_phone(&self, name: &str, phone: &str)
        -> StoreResult<Option<Student>>;

    // Fee payments
    async fn record_payment(&self, input: NewFeePayment) -> StoreResult<FeePayment>;
    async fn list_payments(&self, branch_id: Uuid) -> StoreResult<Vec<FeePayment>>;
    async fn payments_for_student(&self, branch_id: Uuid, student_name: &str)
        -> StoreResult<Vec<FeePayment>>;

    // Users
    async fn create_user(&self, input: NewUser, password_hash: String) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;
    async fn list_institution_admins(&self) -> StoreResult<Vec<User>>;
    async fn list_staff(&self, branch_id: Uuid) -> StoreResult<Vec<User>>;

    // Buses
    async fn create_bus(&self, input: NewBus) -> StoreResult<Bus>;
    async fn get_bus(&self, id: Uuid) -> StoreResult<Bus>;
    /// Active buses only, ordered by fleet code.
    async fn list_active_buses(&self, branch_id: Uuid) -> StoreResult<Vec<Bus>>;
    async fn update_bus(&self, id: Uuid, update: BusUpdate) -> StoreResult<Bus>;
    async fn set_bus_driver(&self, id: Uuid, driver: DriverInfo) -> StoreResult<Bus>;
    async fn set_bus_route(&self, id: Uuid, route: RouteInfo) -> StoreResult<Bus>;
    async fn merge_bus_maintenance(&self, id: Uuid, maintenance: MaintenanceInfo)
        -> StoreResult<Bus>;
    async fn merge_bus_safety(&self, id: Uuid, safety: SafetyInfo) -> StoreResult<Bus>;
    /// Compare-and-set against `expected_status`; a concurrent transition
    /// surfaces as `StaleStatus` instead of silently overwriting.
    async fn update_bus_status(&self, id: Uuid, update: StatusUpdate) -> StoreResult<Bus>;
    /// Soft delete: `is_active=false`, status forced to Out of Service.
    async fn deactivate_bus(&self, id: Uuid) -> StoreResult<()>;

    // Inventory
    async fn create_inventory_item(&self, input: NewInventoryItem) -> StoreResult<InventoryItem>;
    async fn get_inventory_item(&self, id: Uuid) -> StoreResult<InventoryItem>;
    async fn list_inventory(&self, branch_id: Uuid) -> StoreResult<Vec<InventoryItem>>;
    async fn list_low_stock(&self, branch_id: Uuid) -> StoreResult<Vec<InventoryItem>>;
    /// Records the purchase and bumps the item's stock in one atomic step.
    async fn record_purchase(&self, item_id: Uuid, input: NewPurchaseEntry)
        -> StoreResult<PurchaseEntry>;

    // Reporting
    async fn dashboard_totals(&self) -> StoreResult<DashboardTotals>;
    /// The 20 most recently created branches with their institution names.
    async fn recent_branches(&self) -> StoreResult<Vec<BranchSummary>>;
}
