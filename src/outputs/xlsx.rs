//! Spreadsheet export.
//!
//! # Layout
//!
//! | Col | Header           | Width | Content                           |
//! |-----|------------------|-------|-----------------------------------|
//! | A   | Title            | 40    | headline                          |
//! | B   | Article Link     | 15    | hyperlink labelled "View"         |
//! | C   | Publish Time     | 20    | `YYYY-MM-DD HH:MM:SS`             |
//! | D-F | Read/Comment/Like Count | 12 | numbers with thousands separators |
//! | G-H | Source, Category | 15    |                                   |
//! | I   | Summary          | 40    |                                   |

use super::ExportOutcome;
use crate::models::Record;
use crate::utils::ensure_parent_dir;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use std::error::Error;
use tracing::{info, instrument, warn};

pub const SHEET_NAME: &str = "Toutiao Hot Board";
pub const LINK_LABEL: &str = "View";

pub const HEADERS: [&str; 9] = [
    "Title",
    "Article Link",
    "Publish Time",
    "Read Count",
    "Comment Count",
    "Like Count",
    "Source",
    "Category",
    "Summary",
];

const COLUMN_WIDTHS: [f64; 9] = [40.0, 15.0, 20.0, 12.0, 12.0, 12.0, 15.0, 15.0, 40.0];

/// Write `records` to an `.xlsx` file at `path`, creating parent directories.
///
/// # Arguments
///
/// * `records` - Accepted records, written one per row in slice order
/// * `path` - Destination file; an existing file is overwritten
///
/// # Returns
///
/// [`ExportOutcome::Written`] with the row count, or [`ExportOutcome::Skipped`]
/// for an empty slice, in which case no file is created. Errors come from
/// directory creation or from the workbook writer.
#[instrument(level = "info", skip(records), fields(rows = records.len()))]
pub async fn write_records(
    records: &[Record],
    path: &str,
) -> Result<ExportOutcome, Box<dyn Error>> {
    if records.is_empty() {
        warn!("No records to export; spreadsheet not written");
        return Ok(ExportOutcome::Skipped);
    }

    ensure_parent_dir(path).await?;
    let mut workbook = build_workbook(records)?;
    workbook.save(path)?;

    info!(%path, "Spreadsheet written");
    if let Some(first) = records.first() {
        info!(url = %first.url, "First exported link");
    }
    Ok(ExportOutcome::Written {
        path: path.to_string(),
        rows: records.len(),
    })
}

fn build_workbook(records: &[Record]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xD9E1F2))
        .set_border(FormatBorder::Thin);
    let count_format = Format::new().set_num_format("#,##0");

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, width)?;
        sheet.write_string_with_format(0, col, *header, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, record.title.as_str())?;
        sheet.write_url_with_text(row, 1, record.url.as_str(), LINK_LABEL)?;
        sheet.write_string(row, 2, record.published_at_display())?;
        sheet.write_number_with_format(row, 3, record.read_count as f64, &count_format)?;
        sheet.write_number_with_format(row, 4, record.comment_count as f64, &count_format)?;
        sheet.write_number_with_format(row, 5, record.like_count as f64, &count_format)?;
        sheet.write_string(row, 6, record.source.as_str())?;
        sheet.write_string(row, 7, record.category.as_str())?;
        sheet.write_string(row, 8, record.summary.as_str())?;
    }

    Ok(workbook)
}
