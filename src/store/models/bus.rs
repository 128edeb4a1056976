use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalStatus {
    Active,
    #[serde(rename = "Under Maintenance")]
    UnderMaintenance,
    #[serde(rename = "Out of Service")]
    OutOfService,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::Active => "Active",
            OperationalStatus::UnderMaintenance => "Under Maintenance",
            OperationalStatus::OutOfService => "Out of Service",
        }
    }

    /// Lifecycle: Active <-> Under Maintenance -> Out of Service (terminal).
    /// Restating the current status is always a no-op, terminal state
    /// included.
    pub fn can_transition_to(&self, next: OperationalStatus) -> bool {
        use OperationalStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Active, UnderMaintenance) | (UnderMaintenance, Active) => true,
            (Active, OutOfService) | (UnderMaintenance, OutOfService) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    Available,
    #[serde(rename = "Currently Assigned")]
    CurrentlyAssigned,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "Available",
            Availability::CurrentlyAssigned => "Currently Assigned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusCondition {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Service")]
    NeedsService,
}

impl BusCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusCondition::Excellent => "Excellent",
            BusCondition::Good => "Good",
            BusCondition::Fair => "Fair",
            BusCondition::NeedsService => "Needs Service",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Assigned,
    #[serde(rename = "Not Assigned")]
    NotAssigned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverInfo {
    pub driver_id: Option<String>,
    pub driver_name: Option<String>,
    pub contact_number: Option<String>,
    pub license_number: Option<String>,
    pub assignment_status: AssignmentStatus,
}

impl Default for DriverInfo {
    fn default() -> Self {
        Self {
            driver_id: None,
            driver_name: None,
            contact_number: None,
            license_number: None,
            assignment_status: AssignmentStatus::NotAssigned,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteInfo {
    pub route_name: Option<String>,
    pub start_point: Option<String>,
    pub end_point: Option<String>,
    #[serde(default)]
    pub stops: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyInfo {
    #[serde(default)]
    pub gps_enabled: bool,
    #[serde(default)]
    pub camera_installed: bool,
    #[serde(default)]
    pub first_aid_kit: bool,
    #[serde(default)]
    pub fire_extinguisher: bool,
    pub insurance_valid_till: Option<NaiveDate>,
    pub fitness_valid_till: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceInfo {
    pub last_service_date: Option<NaiveDate>,
    pub next_service_due: Option<NaiveDate>,
    pub odometer_km: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: Uuid,
    /// Copied from the owning branch at creation time, never client input.
    pub institution_id: Uuid,
    pub branch_id: Uuid,
    /// Fleet code, e.g. "BUS-07". Globally unique.
    pub bus_id: String,
    /// Vehicle registration plate. Globally unique.
    pub registration_number: String,
    pub bus_type: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<i32>,
    pub build_year: Option<i32>,
    #[serde(default)]
    pub driver: DriverInfo,
    #[serde(default)]
    pub route: RouteInfo,
    #[serde(default)]
    pub safety: SafetyInfo,
    #[serde(default)]
    pub maintenance: MaintenanceInfo,
    pub operational_status: OperationalStatus,
    pub availability: Availability,
    pub bus_condition: BusCondition,
    pub remarks: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBus {
    pub branch_id: Uuid,
    pub bus_id: String,
    pub registration_number: String,
    pub bus_type: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<i32>,
    pub build_year: Option<i32>,
    #[serde(default)]
    pub driver: DriverInfo,
    #[serde(default)]
    pub route: RouteInfo,
    #[serde(default)]
    pub safety: SafetyInfo,
    #[serde(default)]
    pub maintenance: MaintenanceInfo,
    #[serde(default = "default_status")]
    pub operational_status: OperationalStatus,
    #[serde(default = "default_availability")]
    pub availability: Availability,
    #[serde(default = "default_condition")]
    pub bus_condition: BusCondition,
    pub remarks: Option<String>,
}

fn default_status() -> OperationalStatus {
    OperationalStatus::Active
}

fn default_availability() -> Availability {
    Availability::Available
}

fn default_condition() -> BusCondition {
    BusCondition::Good
}

/// General-info update; sub-objects and status have their own endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusUpdate {
    pub bus_id: Option<String>,
    pub registration_number: Option<String>,
    pub bus_type: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<i32>,
    pub build_year: Option<i32>,
    pub remarks: Option<String>,
}

/// Status transition request. `expected_status` is the operational status the
/// caller last observed; the update applies only if it still matches.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub operational_status: Option<OperationalStatus>,
    pub availability: Option<Availability>,
    pub bus_condition: Option<BusCondition>,
    pub expected_status: Option<OperationalStatus>,
}

impl Bus {
    pub fn new(input: NewBus, institution_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            institution_id,
            branch_id: input.branch_id,
            bus_id: input.bus_id,
            registration_number: input.registration_number,
            bus_type: input.bus_type,
            model: input.model,
            capacity: input.capacity,
            build_year: input.build_year,
            driver: input.driver,
            route: input.route,
            safety: input.safety,
            maintenance: input.maintenance,
            operational_status: input.operational_status,
            availability: input.availability,
            bus_condition: input.bus_condition,
            remarks: input.remarks,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: BusUpdate) {
        if let Some(v) = update.bus_id {
            self.bus_id = v;
        }
        if let Some(v) = update.registration_number {
            self.registration_number = v;
        }
        if let Some(v) = update.bus_type {
            self.bus_type = Some(v);
        }
        if let Some(v) = update.model {
            self.model = Some(v);
        }
        if let Some(v) = update.capacity {
            self.capacity = Some(v);
        }
        if let Some(v) = update.build_year {
            self.build_year = Some(v);
        }
        if let Some(v) = update.remarks {
            self.remarks = Some(v);
        }
        self.updated_at = Utc::now();
    }

    pub fn needs_maintenance(&self) -> bool {
        self.bus_condition == BusCondition::NeedsService
            || self.operational_status == OperationalStatus::UnderMaintenance
    }
}
