//! Agent CRM - Scheduled Automation Binary
//!
//! Runs the birthday and renewal jobs once and prints the run report as
//! JSON. Meant for cron, e.g. every morning in the agent's timezone:
//!
//! ```bash
//! crm-automation all
//! crm-automation renewals --date 2025-03-01 --dry-run
//! ```
//!
//! Exits with status 1 when any message failed on every channel and with
//! status 2 on usage or configuration errors.

use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{error, info};

use core_kernel::{CoreError, Timezone};
use domain_automation::{AutomationRunner, JobKind, RunReport};
use interface_api::{bootstrap, config::ApiConfig};

const USAGE: &str = "usage: crm-automation <birthdays|renewals|all> [--date YYYY-MM-DD] [--dry-run]";

#[derive(Debug, PartialEq)]
struct Args {
    kind: JobKind,
    date: Option<NaiveDate>,
    dry_run: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut kind = None;
    let mut date = None;
    let mut dry_run = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--date" => {
                let value = args.next().ok_or("--date needs a value")?;
                let parsed = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|e| format!("invalid --date '{}': {}", value, e))?;
                date = Some(parsed);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if kind.is_none() => {
                kind = Some(other.parse::<JobKind>().map_err(|e| e.to_string())?);
            }
            other => return Err(format!("unexpected argument '{}'", other)),
        }
    }

    Ok(Args {
        kind: kind.ok_or("missing job name")?,
        date,
        dry_run,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid CRM_* configuration: {}", e);
            return ExitCode::from(2);
        }
    };
    let timezone = match check_config(&config) {
        Ok(timezone) => timezone,
        Err(e) => {
            eprintln!("invalid CRM_* configuration: {}", e);
            return ExitCode::from(2);
        }
    };
    bootstrap::init_tracing(&config);

    match run(&config, timezone, &args).await {
        Ok(report) if report.failed > 0 => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), job = args.kind.as_str(), "Automation run failed");
            ExitCode::FAILURE
        }
    }
}

/// Resolves the settings the run depends on before anything connects
fn check_config(config: &ApiConfig) -> Result<Timezone, CoreError> {
    config.currency()?;
    config.timezone()
}

async fn run(config: &ApiConfig, timezone: Timezone, args: &Args) -> anyhow::Result<RunReport> {
    let ports = bootstrap::connect(config).await?;
    let runner = AutomationRunner::new(ports.automation(), timezone);

    let report = runner.run(args.kind, args.date, args.dry_run).await?;
    info!(
        job = args.kind.as_str(),
        date = %report.date,
        matched = report.matched,
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        expired = report.expired,
        "Automation run complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing the run report")?
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_job_and_flags() {
        let parsed = args(&["renewals", "--date", "2025-03-01", "--dry-run"]).unwrap();
        assert_eq!(parsed.kind, JobKind::Renewals);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(parsed.dry_run);

        let parsed = args(&["all"]).unwrap();
        assert_eq!(parsed.kind, JobKind::All);
        assert!(!parsed.dry_run);
    }

    #[test]
    fn test_config_errors_are_caught_before_run() {
        assert_eq!(check_config(&ApiConfig::default()).unwrap().name(), "Asia/Kolkata");

        let bad_zone = ApiConfig {
            timezone: "Asia/Atlantis".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(check_config(&bad_zone), Err(CoreError::Calendar(_))));

        let bad_currency = ApiConfig {
            currency: "XYZ".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(check_config(&bad_currency), Err(CoreError::Money(_))));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(args(&[]).is_err());
        assert!(args(&["weekly"]).is_err());
        assert!(args(&["birthdays", "--date"]).is_err());
        assert!(args(&["birthdays", "--date", "01/03/2025"]).is_err());
        assert!(args(&["birthdays", "renewals"]).is_err());
    }
}
