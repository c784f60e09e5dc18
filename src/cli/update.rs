use super::ui;
use crate::core::{CurrencyPair, RateService};
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Runs a single update cycle.
pub async fn update(service: &RateService) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices from exchange");
    let result = service.update_rates().await;
    pb.finish_and_clear();

    let saved = result.context("Update cycle failed")?;
    println!(
        "{} {}",
        ui::style_text("Rates stored:", ui::StyleType::TotalLabel),
        ui::style_text(&saved.to_string(), ui::StyleType::TotalValue)
    );
    Ok(())
}

/// Prints a freshly computed rate; nothing is stored.
pub async fn current_rate(service: &RateService, pair: &str) -> Result<()> {
    let pair: CurrencyPair = pair.parse()?;

    let pb = ui::new_spinner("Fetching prices from exchange");
    let rate = service.current_rate(pair).await;
    pb.finish_and_clear();

    let Some(rate) = rate else {
        anyhow::bail!("Could not compute rate for {pair}");
    };
    println!(
        "{} {}",
        ui::style_text(&format!("{pair}:"), ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_rate(rate), ui::StyleType::TotalValue)
    );
    Ok(())
}

pub async fn cleanup(service: &RateService) -> Result<()> {
    let deleted = service
        .cleanup_old_data()
        .await
        .context("Cleanup of old rates failed")?;
    println!(
        "{} {}",
        ui::style_text("Records removed:", ui::StyleType::TotalLabel),
        ui::style_text(&deleted.to_string(), ui::StyleType::TotalValue)
    );
    Ok(())
}

/// Probes the exchange and lists its request limits when it advertises them.
pub async fn health(service: &RateService) -> Result<()> {
    if !service.health_check().await {
        println!("{}", ui::style_text("Exchange: unreachable", ui::StyleType::Error));
        anyhow::bail!("Exchange health check failed");
    }
    println!(
        "{} {}",
        ui::style_text("Exchange:", ui::StyleType::TotalLabel),
        ui::style_text("healthy", ui::StyleType::TotalValue)
    );

    match service.rate_limits().await {
        Some(limits) if !limits.is_empty() => {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Type"),
                ui::header_cell("Interval"),
                ui::header_cell("Limit"),
            ]);
            for limit in limits {
                table.add_row(vec![
                    Cell::new(limit.rate_limit_type),
                    Cell::new(format!("{} {}", limit.interval_num, limit.interval)),
                    Cell::new(limit.limit),
                ]);
            }
            println!("{table}");
        }
        _ => println!(
            "{}",
            ui::style_text("Rate limits not available", ui::StyleType::Subtle)
        ),
    }
    Ok(())
}
