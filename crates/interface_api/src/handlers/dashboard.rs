//! Dashboard handler

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::debug;

use core_kernel::calendar::{days_until, start_of_month};
use domain_client::{ActivityQuery, LeadStatus};

use crate::dto::dashboard::{conversion_rate, DashboardStats, LeadStatusCount, UpcomingBirthday};
use crate::error::ApiError;
use crate::AppState;

const CACHE_KEY: &str = "dashboard_stats";
const EXPIRING_WINDOW_DAYS: u32 = 30;
const BIRTHDAY_WINDOW_DAYS: u32 = 7;
const RECENT_ACTIVITY_LIMIT: u32 = 10;

/// Dashboard statistics, served from cache while fresh
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    let stats = state
        .dashboard_cache
        .get_or_try_insert_with(CACHE_KEY, || compute_stats(&state))
        .await?;
    Ok(Json(stats))
}

async fn compute_stats(state: &AppState) -> Result<DashboardStats, ApiError> {
    debug!("Computing dashboard statistics");
    let today = state.timezone.today();
    let ports = &state.ports;

    let counts = ports.leads.count_by_status().await?;
    let count_of = |status: LeadStatus| {
        counts
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    };
    let leads_by_status: Vec<LeadStatusCount> = LeadStatus::ALL
        .into_iter()
        .map(|status| LeadStatusCount {
            status,
            count: count_of(status),
        })
        .collect();
    let total_leads: u64 = leads_by_status.iter().map(|c| c.count).sum();

    let (month_start, _) = state
        .timezone
        .day_bounds(start_of_month(today))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let new_leads_this_month = ports.leads.count_created_since(month_start).await?;

    let total_clients = ports.clients.count_clients().await?;
    let summary = ports.policies.summary(today, EXPIRING_WINDOW_DAYS).await?;

    let upcoming_birthdays = ports
        .clients
        .upcoming_birthdays(today, BIRTHDAY_WINDOW_DAYS)
        .await?
        .into_iter()
        .map(|(client, date)| UpcomingBirthday {
            client_id: client.id,
            name: client.full_name(),
            date,
            days_until: days_until(today, date),
        })
        .collect();

    let recent_activities = ports
        .activities
        .list_recent(ActivityQuery::recent(RECENT_ACTIVITY_LIMIT))
        .await?;

    Ok(DashboardStats {
        total_leads,
        new_leads_this_month,
        conversion_rate: conversion_rate(count_of(LeadStatus::Converted), total_leads),
        leads_by_status,
        total_clients,
        active_policies: summary.active_count,
        expiring_soon: summary.expiring_soon,
        total_active_premium: summary.total_active_premium,
        annualized_premium: summary.annualized_premium,
        upcoming_birthdays,
        recent_activities,
        generated_at: Utc::now(),
    })
}
