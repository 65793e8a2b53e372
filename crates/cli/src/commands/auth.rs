use anyhow::{Context, Result, bail};

use crmv_auth::{SessionStore, SetupConfig, validity};

/// Validity verdict as a scriptable gate: exit 0 when usable, 1 when not.
pub fn check(config: &SetupConfig) -> Result<()> {
    let verdict = validity::check(&config.session_file, config.long_lived_threshold);
    println!("{}: {verdict}", config.session_file.display());

    if verdict.is_valid() {
        Ok(())
    } else {
        bail!("session invalid: {verdict}")
    }
}

/// Show contents of a saved session file
pub fn show(config: &SetupConfig) -> Result<()> {
    let state = SessionStore::new(&config.session_file)
        .load()
        .with_context(|| format!("failed to load {}", config.session_file.display()))?;

    println!("Authentication state from: {}", config.session_file.display());
    println!();

    println!("COOKIES ({}):", state.cookies.len());
    if state.cookies.is_empty() {
        println!("  (none)");
    } else {
        println!("  {:<20} {:<30} {:<20}", "NAME", "DOMAIN", "EXPIRES");
        println!("  {}", "-".repeat(70));
        for cookie in &state.cookies {
            println!(
                "  {:<20} {:<30} {:<20}",
                cookie.name,
                cookie.domain,
                format_expiry(cookie.expires)
            );
        }
    }

    println!();

    println!("LOCAL STORAGE ({} origins):", state.origins.len());
    if state.origins.is_empty() {
        println!("  (none)");
    } else {
        for origin in &state.origins {
            println!("  {}:", origin.origin);
            for entry in &origin.local_storage {
                let value = if entry.value.len() > 50 {
                    format!("{}...", &entry.value[..50])
                } else {
                    entry.value.clone()
                };
                println!("    {}: {}", entry.name, value);
            }
        }
    }

    Ok(())
}

fn format_expiry(expires: Option<f64>) -> String {
    match expires {
        None => "session".to_string(),
        Some(ts) if ts < 0.0 => "session".to_string(),
        Some(ts) => {
            let secs = ts as i64;
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            if secs < now {
                "expired".to_string()
            } else {
                let diff = secs - now;
                if diff < 3600 {
                    format!("{}m", diff / 60)
                } else if diff < 86400 {
                    format!("{}h", diff / 3600)
                } else {
                    format!("{}d", diff / 86400)
                }
            }
        }
    }
}
