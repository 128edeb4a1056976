//! Bus fleet statistics for a branch, computed in one pass over the
//! active-bus set. Empty fleets yield zero counts, never errors.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::models::{AssignmentStatus, Bus};

#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_condition: BTreeMap<String, usize>,
    pub by_availability: BTreeMap<String, usize>,
    pub with_driver: usize,
    /// Condition "Needs Service" OR status "Under Maintenance"; a bus
    /// satisfying both counts once.
    pub needs_maintenance: usize,
}

pub fn fleet_stats(buses: &[Bus]) -> FleetStats {
    let mut stats = FleetStats::default();
    for bus in buses {
        stats.total += 1;
        *stats
            .by_status
            .entry(bus.operational_status.as_str().to_string())
            .or_default() += 1;
        *stats
            .by_condition
            .entry(bus.bus_condition.as_str().to_string())
            .or_default() += 1;
        *stats
            .by_availability
            .entry(bus.availability.as_str().to_string())
            .or_default() += 1;
        if bus.driver.assignment_status == AssignmentStatus::Assigned {
            stats.with_driver += 1;
        }
        if bus.needs_maintenance() {
            stats.needs_maintenance += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::store::models::{
        Availability, Bus, BusCondition, DriverInfo, MaintenanceInfo, NewBus, OperationalStatus,
        RouteInfo, SafetyInfo,
    };

    fn bus(
        n: usize,
        status: OperationalStatus,
        condition: BusCondition,
        with_driver: bool,
    ) -> Bus {
        let driver = DriverInfo {
            driver_name: with_driver.then(|| "Murugan".to_string()),
            assignment_status: if with_driver {
                AssignmentStatus::Assigned
            } else {
                AssignmentStatus::NotAssigned
            },
            ..Default::default()
        };
        Bus::new(
            NewBus {
                branch_id: Uuid::new_v4(),
                bus_id: format!("BUS-{:02}", n),
                registration_number: format!("TN-01-{:04}", n),
                bus_type: None,
                model: None,
                capacity: None,
                build_year: None,
                driver,
                route: RouteInfo::default(),
                safety: SafetyInfo::default(),
                maintenance: MaintenanceInfo::default(),
                operational_status: status,
                availability: Availability::Available,
                bus_condition: condition,
                remarks: None,
            },
            Uuid::new_v4(),
        )
    }

    #[test]
    fn empty_fleet_yields_zero_counts() {
        let stats = fleet_stats(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.by_status.is_empty());
        assert_eq!(stats.with_driver, 0);
        assert_eq!(stats.needs_maintenance, 0);
    }

    #[test]
    fn four_bus_branch_breakdown() {
        use BusCondition::*;
        use OperationalStatus::*;
        let buses = vec![
            bus(1, Active, Good, true),
            bus(2, Active, Good, false),
            bus(3, UnderMaintenance, NeedsService, false),
            bus(4, UnderMaintenance, Fair, false),
        ];
        let stats = fleet_stats(&buses);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_status["Active"], 2);
        assert_eq!(stats.by_status["Under Maintenance"], 2);
        assert_eq!(stats.with_driver, 1);
        // Two Under Maintenance; the Needs-Service bus is one of them and
        // counts once.
        assert_eq!(stats.needs_maintenance, 2);
    }

    #[test]
    fn needs_maintenance_counts_union_not_sum() {
        use BusCondition::*;
        use OperationalStatus::*;
        // Needs Service while also Under Maintenance counts once.
        let buses = vec![bus(1, UnderMaintenance, NeedsService, false)];
        let stats = fleet_stats(&buses);
        assert_eq!(stats.needs_maintenance, 1);
    }
}
