//! Portfolio figures for the dashboard

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};

use crate::instance::{PolicyInstance, PolicyStatus};

/// Aggregate view of the active book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub active_count: u64,
    /// Active policies ending within the window
    pub expiring_soon: u64,
    /// Sum of active installment premiums
    pub total_active_premium: Money,
    pub annualized_premium: Money,
}

impl PolicySummary {
    pub fn empty(currency: Currency) -> Self {
        Self {
            active_count: 0,
            expiring_soon: 0,
            total_active_premium: Money::zero(currency),
            annualized_premium: Money::zero(currency),
        }
    }

    /// Computes the summary over `policies`
    ///
    /// Premiums in a currency other than `currency` are counted but left
    /// out of the totals.
    pub fn compute<'a>(
        policies: impl IntoIterator<Item = &'a PolicyInstance>,
        today: NaiveDate,
        window_days: u32,
        currency: Currency,
    ) -> Self {
        let mut summary = Self::empty(currency);
        for policy in policies {
            if policy.status != PolicyStatus::Active {
                continue;
            }
            summary.active_count += 1;
            if policy.is_expiring_within(today, window_days) {
                summary.expiring_soon += 1;
            }
            if policy.premium.currency() == currency {
                summary.total_active_premium = Money::new(
                    summary.total_active_premium.amount() + policy.premium.amount(),
                    currency,
                );
                summary.annualized_premium = Money::new(
                    summary.annualized_premium.amount() + policy.annualized_premium().amount(),
                    currency,
                );
            }
        }
        summary
    }
}
