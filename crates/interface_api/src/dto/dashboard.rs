//! Dashboard DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use core_kernel::{ClientId, Money};
use domain_client::{Activity, LeadStatus};

#[derive(Debug, Clone, Serialize)]
pub struct LeadStatusCount {
    pub status: LeadStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingBirthday {
    pub client_id: ClientId,
    pub name: String,
    pub date: NaiveDate,
    pub days_until: i64,
}

/// Aggregate shown on the agent's home screen
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_leads: u64,
    pub new_leads_this_month: u64,
    pub leads_by_status: Vec<LeadStatusCount>,
    /// Converted leads as a percentage of all leads, one decimal place
    pub conversion_rate: f64,
    pub total_clients: u64,
    pub active_policies: u64,
    pub expiring_soon: u64,
    pub total_active_premium: Money,
    pub annualized_premium: Money,
    pub upcoming_birthdays: Vec<UpcomingBirthday>,
    pub recent_activities: Vec<Activity>,
    pub generated_at: DateTime<Utc>,
}

/// Percentage with one decimal place; zero when there are no leads
pub fn conversion_rate(converted: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (converted as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_rate() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(1, 3), 33.3);
        assert_eq!(conversion_rate(2, 3), 66.7);
        assert_eq!(conversion_rate(5, 5), 100.0);
    }
}
