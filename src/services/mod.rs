pub mod fee_report;
pub mod fleet_stats;
