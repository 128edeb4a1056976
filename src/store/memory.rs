//! In-memory `Store` backend. Used for development without a database,
//! demo seeding, and the integration-test suite.
//!
//! The whole world lives behind one `RwLock`, so uniqueness checks, the
//! branch-limit check, and compare-and-set status updates are all atomic
//! with respect to each other.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::*;
use super::{BranchSummary, DashboardTotals, Orphans, Store, StoreError, StoreResult};

#[derive(Default)]
struct World {
    institutions: HashMap<Uuid, Institution>,
    branches: HashMap<Uuid, Branch>,
    students: HashMap<Uuid, Student>,
    payments: Vec<FeePayment>,
    users: HashMap<Uuid, User>,
    buses: HashMap<Uuid, Bus>,
    items: HashMap<Uuid, InventoryItem>,
    purchases: Vec<PurchaseEntry>,
}

#[derive(Default)]
pub struct MemStore {
    world: RwLock<World>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn merge_maintenance(current: &mut MaintenanceInfo, patch: MaintenanceInfo) {
    if patch.last_service_date.is_some() {
        current.last_service_date = patch.last_service_date;
    }
    if patch.next_service_due.is_some() {
        current.next_service_due = patch.next_service_due;
    }
    if patch.odometer_km.is_some() {
        current.odometer_km = patch.odometer_km;
    }
    if patch.notes.is_some() {
        current.notes = patch.notes;
    }
}

fn merge_safety(current: &mut SafetyInfo, patch: SafetyInfo) {
    current.gps_enabled = patch.gps_enabled;
    current.camera_installed = patch.camera_installed;
    current.first_aid_kit = patch.first_aid_kit;
    current.fire_extinguisher = patch.fire_extinguisher;
    if patch.insurance_valid_till.is_some() {
        current.insurance_valid_till = patch.insurance_valid_till;
    }
    if patch.fitness_valid_till.is_some() {
        current.fitness_valid_till = patch.fitness_valid_till;
    }
}

#[async_trait]
impl Store for MemStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // ---- Institutions ----

    async fn create_institution(&self, input: NewInstitution) -> StoreResult<Institution> {
        let mut world = self.world.write().await;
        if world.institutions.values().any(|i| i.code == input.code) {
            return Err(StoreError::duplicate(format!("institution code '{}'", input.code)));
        }
        let institution = Institution::new(input);
        world.institutions.insert(institution.id, institution.clone());
        Ok(institution)
    }

    async fn list_institutions(&self) -> StoreResult<Vec<Institution>> {
        let world = self.world.read().await;
        let mut list: Vec<_> = world.institutions.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn get_institution(&self, id: Uuid) -> StoreResult<Institution> {
        let world = self.world.read().await;
        world
            .institutions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("institution"))
    }

    async fn update_institution(
        &self,
        id: Uuid,
        update: InstitutionUpdate,
    ) -> StoreResult<Institution> {
        let mut world = self.world.write().await;
        let institution = world
            .institutions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("institution"))?;
        institution.apply(update);
        Ok(institution.clone())
    }

    async fn delete_institution(&self, id: Uuid) -> StoreResult<Orphans> {
        let mut world = self.world.write().await;
        if world.institutions.remove(&id).is_none() {
            return Err(StoreError::not_found("institution"));
        }
        Ok(Orphans {
            branches: world.branches.values().filter(|b| b.institution_id == id).count() as u64,
            students: world.students.values().filter(|s| s.institution_id == id).count() as u64,
            buses: world.buses.values().filter(|b| b.institution_id == id).count() as u64,
            fee_payments: world.payments.iter().filter(|p| p.institution_id == id).count() as u64,
            users: world
                .users
                .values()
                .filter(|u| u.institution_id == Some(id))
                .count() as u64,
            ..Default::default()
        })
    }

    // ---- Branches ----

    async fn create_branch(&self, input: NewBranch) -> StoreResult<Branch> {
        let mut world = self.world.write().await;
        let institution = world
            .institutions
            .get(&input.institution_id)
            .ok_or_else(|| StoreError::not_found("institution"))?;
        let existing = world
            .branches
            .values()
            .filter(|b| b.institution_id == input.institution_id)
            .count();
        if existing as i32 >= institution.max_branches {
            return Err(StoreError::BranchLimit);
        }
        let branch = Branch::new(input);
        world.branches.insert(branch.id, branch.clone());
        Ok(branch)
    }

    async fn get_branch(&self, id: Uuid) -> StoreResult<Branch> {
        let world = self.world.read().await;
        world
            .branches
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("branch"))
    }

    async fn update_branch(&self, id: Uuid, update: BranchUpdate) -> StoreResult<Branch> {
        let mut world = self.world.write().await;
        let branch = world
            .branches
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("branch"))?;
        branch.apply(update);
        Ok(branch.clone())
    }

    async fn delete_branch(&self, id: Uuid) -> StoreResult<Orphans> {
        let mut world = self.world.write().await;
        if world.branches.remove(&id).is_none() {
            return Err(StoreError::not_found("branch"));
        }
        Ok(Orphans {
            students: world.students.values().filter(|s| s.branch_id == id).count() as u64,
            buses: world.buses.values().filter(|b| b.branch_id == id).count() as u64,
            fee_payments: world.payments.iter().filter(|p| p.branch_id == id).count() as u64,
            users: world.users.values().filter(|u| u.branch_id == Some(id)).count() as u64,
            inventory_items: world.items.values().filter(|i| i.branch_id == id).count() as u64,
            ..Default::default()
        })
    }

    async fn list_branches(&self, institution_id: Uuid) -> StoreResult<Vec<Branch>> {
        let world = self.world.read().await;
        if !world.institutions.contains_key(&institution_id) {
            return Err(StoreError::not_found("institution"));
        }
        let mut list: Vec<_> = world
            .branches
            .values()
            .filter(|b| b.institution_id == institution_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.branch_name.cmp(&b.branch_name));
        Ok(list)
    }

    // ---- Students ----

    async fn create_student(&self, input: NewStudent) -> StoreResult<Student> {
        let mut world = self.world.write().await;
        let branch = world
            .branches
            .get(&input.branch_id)
            .ok_or_else(|| StoreError::not_found("branch"))?;
        let institution_id = branch.institution_id;
        if world.students.values().any(|s| {
            s.institution_id == institution_id && s.admission_number == input.admission_number
        }) {
            return Err(StoreError::duplicate(format!(
                "admission number '{}'",
                input.admission_number
            )));
        }
        let student = Student::new(input, institution_id);
        world.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn get_student(&self, id: Uuid) -> StoreResult<Student> {
        let world = self.world.read().await;
        world
            .students
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("student"))
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> StoreResult<Student> {
        let mut world = self.world.write().await;
        let student = world
            .students
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("student"))?;
        student.apply(update);
        Ok(student.clone())
    }

    async fn list_students(&self, branch_id: Uuid) -> StoreResult<Vec<Student>> {
        let world = self.world.read().await;
        let mut list: Vec<_> = world
            .students
            .values()
            .filter(|s| s.branch_id == branch_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.admission_number.cmp(&b.admission_number));
        Ok(list)
    }

    async fn add_exam(&self, student_id: Uuid, exam: Exam) -> StoreResult<Student> {
        let mut world = self.world.write().await;
        let student = world
            .students
            .get_mut(&student_id)
            .ok_or_else(|| StoreError::not_found("student"))?;
        student.exams.push(exam);
        student.updated_at = chrono::Utc::now();
        Ok(student.clone())
    }

    async fn set_attendance(
        &self,
        student_id: Uuid,
        attendance: Attendance,
    ) -> StoreResult<Student> {
        let mut world = self.world.write().await;
        let student = world
            .students
            .get_mut(&student_id)
            .ok_or_else(|| StoreError::not_found("student"))?;
        student.attendance = Some(attendance);
        student.updated_at = chrono::Utc::now();
        Ok(student.clone())
    }

    async fn find_student_by_name_phone(
        &self,
        name: &str,
        phone: &str,
    ) -> StoreResult<Option<Student>> {
        let world = self.world.read().await;
        let wanted = normalized_name(name);
        let phone = phone.trim();
        let mut matches: Vec<_> = world
            .students
            .values()
            .filter(|s| {
                normalized_name(&s.name) == wanted
                    && s.phone_no.as_deref().map(str::trim) == Some(phone)
            })
            .cloned()
            .collect();
        // Deterministic "first match" when siblings share a name and phone.
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches.into_iter().next())
    }

    // ---- Fee payments ----

    async fn record_payment(&self, input: NewFeePayment) -> StoreResult<FeePayment> {
        let mut world = self.world.write().await;
        let branch = world
            .branches
            .get(&input.branch_id)
            .ok_or_else(|| StoreError::not_found("branch"))?;
        let payment = FeePayment::new(input, branch.institution_id);
        world.payments.push(payment.clone());
        Ok(payment)
    }

    async fn list_payments(&self, branch_id: Uuid) -> StoreResult<Vec<FeePayment>> {
        let world = self.world.read().await;
        Ok(world
            .payments
            .iter()
            .filter(|p| p.branch_id == branch_id)
            .cloned()
            .collect())
    }

    async fn payments_for_student(
        &self,
        branch_id: Uuid,
        student_name: &str,
    ) -> StoreResult<Vec<FeePayment>> {
        let world = self.world.read().await;
        let wanted = normalized_name(student_name);
        Ok(world
            .payments
            .iter()
            .filter(|p| p.branch_id == branch_id && normalized_name(&p.student_name) == wanted)
            .cloned()
            .collect())
    }

    // ---- Users ----

    async fn create_user(&self, input: NewUser, password_hash: String) -> StoreResult<User> {
        let mut world = self.world.write().await;
        if world
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(StoreError::duplicate(format!("email '{}'", input.email)));
        }
        let mut user = User::new(input);
        user.password_hash = Some(password_hash);
        world.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        let world = self.world.read().await;
        world
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user"))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let world = self.world.read().await;
        Ok(world
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let mut world = self.world.write().await;
        if let Some(email) = &update.email {
            if world
                .users
                .values()
                .any(|u| u.id != id && u.email.eq_ignore_ascii_case(email))
            {
                return Err(StoreError::duplicate(format!("email '{}'", email)));
            }
        }
        let user = world
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user"))?;
        user.apply(update);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        let mut world = self.world.write().await;
        world
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("user"))
    }

    async fn list_institution_admins(&self) -> StoreResult<Vec<User>> {
        let world = self.world.read().await;
        let mut list: Vec<_> = world
            .users
            .values()
            .filter(|u| u.role == Role::InstitutionAdmin)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn list_staff(&self, branch_id: Uuid) -> StoreResult<Vec<User>> {
        let world = self.world.read().await;
        let mut list: Vec<_> = world
            .users
            .values()
            .filter(|u| u.role == Role::Staff && u.branch_id == Some(branch_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    // ---- Buses ----

    async fn create_bus(&self, input: NewBus) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        let branch = world
            .branches
            .get(&input.branch_id)
            .ok_or_else(|| StoreError::not_found("branch"))?;
        let institution_id = branch.institution_id;
        if world.buses.values().any(|b| b.bus_id == input.bus_id) {
            return Err(StoreError::duplicate(format!("bus id '{}'", input.bus_id)));
        }
        if world
            .buses
            .values()
            .any(|b| b.registration_number == input.registration_number)
        {
            return Err(StoreError::duplicate(format!(
                "registration number '{}'",
                input.registration_number
            )));
        }
        let bus = Bus::new(input, institution_id);
        world.buses.insert(bus.id, bus.clone());
        Ok(bus)
    }

    async fn get_bus(&self, id: Uuid) -> StoreResult<Bus> {
        let world = self.world.read().await;
        world
            .buses
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("bus"))
    }

    async fn list_active_buses(&self, branch_id: Uuid) -> StoreResult<Vec<Bus>> {
        let world = self.world.read().await;
        let mut list: Vec<_> = world
            .buses
            .values()
            .filter(|b| b.branch_id == branch_id && b.is_active)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.bus_id.cmp(&b.bus_id));
        Ok(list)
    }

    async fn update_bus(&self, id: Uuid, update: BusUpdate) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        if !world.buses.contains_key(&id) {
            return Err(StoreError::not_found("bus"));
        }
        if let Some(bus_id) = &update.bus_id {
            if world.buses.values().any(|b| b.id != id && &b.bus_id == bus_id) {
                return Err(StoreError::duplicate(format!("bus id '{}'", bus_id)));
            }
        }
        if let Some(reg) = &update.registration_number {
            if world
                .buses
                .values()
                .any(|b| b.id != id && &b.registration_number == reg)
            {
                return Err(StoreError::duplicate(format!("registration number '{}'", reg)));
            }
        }
        let bus = world.buses.get_mut(&id).expect("checked above");
        bus.apply(update);
        Ok(bus.clone())
    }

    async fn set_bus_driver(&self, id: Uuid, mut driver: DriverInfo) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        let bus = world
            .buses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bus"))?;
        driver.assignment_status = if driver.driver_name.is_some() {
            AssignmentStatus::Assigned
        } else {
            AssignmentStatus::NotAssigned
        };
        bus.driver = driver;
        bus.updated_at = chrono::Utc::now();
        Ok(bus.clone())
    }

    async fn set_bus_route(&self, id: Uuid, route: RouteInfo) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        let bus = world
            .buses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bus"))?;
        bus.route = route;
        bus.updated_at = chrono::Utc::now();
        Ok(bus.clone())
    }

    async fn merge_bus_maintenance(
        &self,
        id: Uuid,
        maintenance: MaintenanceInfo,
    ) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        let bus = world
            .buses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bus"))?;
        merge_maintenance(&mut bus.maintenance, maintenance);
        bus.updated_at = chrono::Utc::now();
        Ok(bus.clone())
    }

    async fn merge_bus_safety(&self, id: Uuid, safety: SafetyInfo) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        let bus = world
            .buses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bus"))?;
        merge_safety(&mut bus.safety, safety);
        bus.updated_at = chrono::Utc::now();
        Ok(bus.clone())
    }

    async fn update_bus_status(&self, id: Uuid, update: StatusUpdate) -> StoreResult<Bus> {
        let mut world = self.world.write().await;
        let bus = world
            .buses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bus"))?;
        if let Some(expected) = update.expected_status {
            if bus.operational_status != expected {
                return Err(StoreError::StaleStatus);
            }
        }
        if let Some(next) = update.operational_status {
            if !bus.operational_status.can_transition_to(next) {
                return Err(StoreError::InvalidTransition {
                    from: bus.operational_status.as_str(),
                    to: next.as_str(),
                });
            }
            bus.operational_status = next;
        }
        if let Some(availability) = update.availability {
            bus.availability = availability;
        }
        if let Some(condition) = update.bus_condition {
            bus.bus_condition = condition;
        }
        bus.updated_at = chrono::Utc::now();
        Ok(bus.clone())
    }

    async fn deactivate_bus(&self, id: Uuid) -> StoreResult<()> {
        let mut world = self.world.write().await;
        let bus = world
            .buses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("bus"))?;
        bus.is_active = false;
        bus.operational_status = OperationalStatus::OutOfService;
        bus.updated_at = chrono::Utc::now();
        Ok(())
    }

    // ---- Inventory ----

    async fn create_inventory_item(&self, input: NewInventoryItem) -> StoreResult<InventoryItem> {
        let mut world = self.world.write().await;
        if !world.branches.contains_key(&input.branch_id) {
            return Err(StoreError::not_found("branch"));
        }
        let item = InventoryItem::new(input);
        world.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_inventory_item(&self, id: Uuid) -> StoreResult<InventoryItem> {
        let world = self.world.read().await;
        world
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("inventory item"))
    }

    async fn list_inventory(&self, branch_id: Uuid) -> StoreResult<Vec<InventoryItem>> {
        let world = self.world.read().await;
        let mut list: Vec<_> = world
            .items
            .values()
            .filter(|i| i.branch_id == branch_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn list_low_stock(&self, branch_id: Uuid) -> StoreResult<Vec<InventoryItem>> {
        Ok(self
            .list_inventory(branch_id)
            .await?
            .into_iter()
            .filter(InventoryItem::is_low_stock)
            .collect())
    }

    async fn record_purchase(
        &self,
        item_id: Uuid,
        input: NewPurchaseEntry,
    ) -> StoreResult<PurchaseEntry> {
        let mut world = self.world.write().await;
        let item = world
            .items
            .get_mut(&item_id)
            .ok_or_else(|| StoreError::not_found("inventory item"))?;
        item.current_stock += input.quantity;
        item.updated_at = chrono::Utc::now();
        let entry = PurchaseEntry::new(input, item.branch_id, item_id);
        world.purchases.push(entry.clone());
        Ok(entry)
    }

    // ---- Reporting ----

    async fn dashboard_totals(&self) -> StoreResult<DashboardTotals> {
        let world = self.world.read().await;
        Ok(DashboardTotals {
            institutions: world.institutions.len() as u64,
            branches: world.branches.len() as u64,
            students: world.students.len() as u64,
            fee_collected: world.payments.iter().map(|p| p.amount).sum(),
        })
    }

    async fn recent_branches(&self) -> StoreResult<Vec<BranchSummary>> {
        let world = self.world.read().await;
        let mut branches: Vec<_> = world.branches.values().collect();
        branches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(branches
            .into_iter()
            .take(20)
            .map(|b| BranchSummary {
                id: b.id,
                name: b.branch_name.clone(),
                institution_name: world
                    .institutions
                    .get(&b.institution_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}
