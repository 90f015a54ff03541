//! Area-chair report command handler.

use anyhow::{Context, Result};
use tracing::info;

use reviewdesk::ac_tasks::AcTaskReport;
use reviewdesk::config::Config;
use reviewdesk::openreview::OpenReviewClient;
use reviewdesk::sheets::{self, GoogleSheet, Row, WriteOptions};

/// Build the AC report and write it to the configured worksheet.
pub(crate) async fn cmd_ac_tasks(
    mut config: Config,
    conference: Option<String>,
    sheet: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let conference = conference.unwrap_or_else(|| config.ac_tasks.conference_id.clone());
    if let Some(sheet) = sheet {
        config.sheets.sheet_name = sheet;
    }

    let client = OpenReviewClient::connect(&config.openreview)
        .await
        .with_context(|| "Failed to connect to OpenReview")?;
    let papers = AcTaskReport::new(&client, &conference)
        .collect()
        .await
        .with_context(|| format!("Failed to collect AC papers for {}", conference))?;

    if papers.is_empty() {
        println!("No AC papers found for {}.", conference);
        return Ok(());
    }

    let rows: Vec<Row> = papers.iter().map(|p| p.to_row()).collect();
    let headers = sheets::sorted_headers(&rows);

    if dry_run {
        println!("{}", headers.join("\t"));
        for row in &rows {
            let cells: Vec<String> = sheets::row_values(row, &headers)
                .iter()
                .map(|c| c.render())
                .collect();
            println!("{}", cells.join("\t"));
        }
        return Ok(());
    }

    let sink = GoogleSheet::connect(&config.sheets)
        .await
        .with_context(|| "Failed to open the Google Sheet")?;
    let options = WriteOptions {
        headers: Some(headers),
        empty_sheet: false,
        write_headers: true,
        start_row_idx: 0,
        batch_size: config.sheets.batch_size,
    };
    let next_row = sheets::write_rows(&sink, &rows, &options)
        .await
        .with_context(|| format!("Failed to write rows to sheet '{}'", sink.sheet_name()))?;

    info!(rows = rows.len(), next_row, "Sheet updated");
    println!(
        "Wrote {} paper(s) to sheet '{}'.",
        rows.len(),
        sink.sheet_name()
    );
    Ok(())
}
