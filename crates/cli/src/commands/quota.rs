//! `dealdesk quota`: tenant credit quotas in the SQLite store.

use chrono::Utc;
use dealdesk_config::AppConfig;
use dealdesk_core::quota::QuotaState;
use dealdesk_core::tenant::TenantId;
use dealdesk_memory::SqliteQuotaStore;
use dealdesk_quota::QuotaGovernor;
use std::sync::Arc;
use tracing::debug;

struct QuotaAdmin {
    config: AppConfig,
    store: Arc<SqliteQuotaStore>,
    governor: QuotaGovernor,
}

async fn open() -> Result<QuotaAdmin, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let path = config.database_path();
    let store = Arc::new(
        SqliteQuotaStore::open(&path, config.quota.default_monthly_limit).await?,
    );
    debug!(path = %path.display(), "Opened quota store");
    let governor = QuotaGovernor::new(store.clone());
    Ok(QuotaAdmin {
        config,
        store,
        governor,
    })
}

pub async fn show(tenant: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let admin = open().await?;

    match tenant {
        Some(tenant) => {
            let tenant = TenantId::from(tenant);
            let state = admin.governor.snapshot(&tenant, Utc::now()).await?;
            print_state(&tenant, &state);
        }
        None => {
            let tenants = admin.store.list().await?;
            if tenants.is_empty() {
                println!(
                    "No tenants recorded in {}",
                    admin.config.database_path().display()
                );
                return Ok(());
            }
            println!(
                "{:<24} {:>10} {:>10} {:>10} {:>12}",
                "Tenant", "Limit", "Extra", "Used", "Remaining"
            );
            for (tenant, state) in &tenants {
                println!(
                    "{:<24} {:>10} {:>10.2} {:>10.2} {:>12}",
                    tenant.as_str(),
                    format_limit(state.base_limit),
                    state.extra,
                    state.used,
                    format_remaining(state.remaining())
                );
            }
            println!();
            println!("  {} tenants", tenants.len());
        }
    }

    Ok(())
}

pub async fn check(tenant: &str) -> Result<(), Box<dyn std::error::Error>> {
    let admin = open().await?;
    let tenant = TenantId::from(tenant);

    let decision = admin.governor.check(&tenant, Utc::now()).await?;
    let remaining = format_remaining(decision.remaining);
    if decision.allowed {
        println!("✅ {tenant} may run a turn ({remaining} credits left)");
    } else {
        println!("⛔ {tenant} is over quota ({remaining} credits left)");
    }
    Ok(())
}

pub async fn commit(tenant: &str, credits: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
    let admin = open().await?;
    let tenant = TenantId::from(tenant);
    let credits = credits.unwrap_or(admin.config.quota.credits_per_reply);
    if !credits.is_finite() || credits < 0.0 {
        return Err(format!("Credits must be a non-negative number, got {credits}").into());
    }

    admin.governor.snapshot(&tenant, Utc::now()).await?;
    let state = admin.governor.try_commit(&tenant, credits).await?;
    println!("💵 Charged {credits} credits");
    print_state(&tenant, &state);
    Ok(())
}

pub async fn set_limit(
    tenant: &str,
    limit: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(limit) = limit {
        if !limit.is_finite() || limit < 0.0 {
            return Err(format!("Limit must be a non-negative number, got {limit}").into());
        }
    }
    let admin = open().await?;
    let tenant = TenantId::from(tenant);

    let state = admin.governor.set_base_limit(&tenant, limit).await?;
    print_state(&tenant, &state);
    Ok(())
}

pub async fn add_extra(tenant: &str, credits: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !credits.is_finite() || credits <= 0.0 {
        return Err(format!("Extra credits must be positive, got {credits}").into());
    }
    let admin = open().await?;
    let tenant = TenantId::from(tenant);

    let state = admin.governor.grant_extra(&tenant, credits, Utc::now()).await?;
    print_state(&tenant, &state);
    Ok(())
}

fn print_state(tenant: &TenantId, state: &QuotaState) {
    println!("📊 Quota for {tenant}");
    println!("─────────────────────────────────────");
    println!("  Monthly limit: {}", format_limit(state.base_limit));
    println!("  Extra credits: {:.2}", state.extra);
    println!("  Used:          {:.2}", state.used);
    println!("  Remaining:     {}", format_remaining(state.remaining()));
    println!("  Period start:  {}", state.reset_at.format("%Y-%m-%d %H:%M UTC"));
}

fn format_limit(limit: Option<f64>) -> String {
    limit.map_or_else(|| "unlimited".into(), |l| format!("{l:.2}"))
}

fn format_remaining(remaining: f64) -> String {
    if remaining.is_infinite() {
        "unlimited".into()
    } else {
        format!("{remaining:.2}")
    }
}
