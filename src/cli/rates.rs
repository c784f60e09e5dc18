use super::ui;
use crate::core::{ErrorBody, QueryKind, RatesError, RatesResponse};
use anyhow::Result;
use comfy_table::Cell;

/// Prints the outcome of a history query, either as a table or as JSON.
///
/// A failed query prints its [`ErrorBody`] and is still returned as an error
/// so the process exits non-zero.
pub fn run(
    result: Result<RatesResponse, RatesError>,
    kind: QueryKind,
    json: bool,
) -> anyhow::Result<()> {
    match result {
        Ok(response) if json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Ok(response) => {
            print_table(&response);
            Ok(())
        }
        Err(e) => {
            let body = ErrorBody::for_query(&e, kind);
            if json {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_error(&body);
            }
            Err(anyhow::Error::new(e).context(format!("Query failed with status {}", body.status())))
        }
    }
}

fn print_table(response: &RatesResponse) {
    println!(
        "\nPair: {}",
        ui::style_text(response.pair.as_str(), ui::StyleType::Title)
    );

    if response.data.is_empty() {
        println!(
            "{}",
            ui::style_text("No rates recorded for this period.", ui::StyleType::Subtle)
        );
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Timestamp (UTC)"), ui::header_cell("Rate")]);
    for point in &response.data {
        table.add_row(vec![Cell::new(&point.timestamp), ui::rate_cell(point.rate)]);
    }
    println!("{table}");

    println!(
        "{} {}",
        ui::style_text("Records:", ui::StyleType::TotalLabel),
        ui::style_text(&response.count.to_string(), ui::StyleType::TotalValue)
    );
}

fn print_error(body: &ErrorBody) {
    eprintln!("{}", ui::style_text(&body.error, ui::StyleType::Error));
    if let Some(pairs) = &body.supported_pairs {
        eprintln!(
            "{}",
            ui::style_text(
                &format!("Supported pairs: {}", pairs.join(", ")),
                ui::StyleType::Subtle
            )
        );
    }
    if let Some(format) = &body.date_format {
        eprintln!(
            "{}",
            ui::style_text(&format!("Date format: {format}"), ui::StyleType::Subtle)
        );
    }
}
