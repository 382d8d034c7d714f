//! CSV export of year plans and JSON export of cost reports.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::model::{Appliance, TwinWorld};
use crate::plan::cost::CostReport;
use crate::plan::year_plan::YearPlan;

/// Column header for the schedule CSV export.
const HEADER: &str = "appliance_id,household_id,day,energy_bits,no_energy_bits,\
                      energy_int,no_energy_int,grid_slots,solar_slots";

/// Failure while writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Exports the active days of every plan to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `ExportError` if file creation or writing fails.
pub fn export_schedule_csv(
    plans: &[(Appliance, YearPlan)],
    path: &Path,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_schedule_csv(plans, io::BufWriter::new(file))
}

/// Writes one row per (appliance, active day) as CSV to any writer.
///
/// Bitmaps are rendered slot 0 first. The integer columns hold the storage
/// encoding (bit `i` = slot `i`) and are left empty past 64 slots.
///
/// # Errors
///
/// Returns an `ExportError` if writing fails.
pub fn write_schedule_csv(
    plans: &[(Appliance, YearPlan)],
    writer: impl Write,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for (appliance, plan) in plans {
        for schedule in plan.active_days() {
            let (energy_int, no_energy_int) = schedule
                .to_storage()
                .map(|(e, n)| (e.to_string(), n.to_string()))
                .unwrap_or_default();
            wtr.write_record(&[
                appliance.id.to_string(),
                appliance.household_id.to_string(),
                schedule.day().to_string(),
                schedule.grid_energy().to_string(),
                schedule.non_grid_energy().to_string(),
                energy_int,
                no_energy_int,
                schedule.grid_energy().count_ones().to_string(),
                schedule.non_grid_energy().count_ones().to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    twin_world: &'a TwinWorld,
    report: &'a CostReport,
}

/// Exports cost reports as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `ExportError` if file creation or serialization fails.
pub fn export_report_json(
    reports: &[(TwinWorld, CostReport)],
    path: &Path,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_report_json(reports, io::BufWriter::new(file))
}

/// Writes cost reports as a JSON array to any writer.
///
/// # Errors
///
/// Returns an `ExportError` if serialization or writing fails.
pub fn write_report_json(
    reports: &[(TwinWorld, CostReport)],
    mut writer: impl Write,
) -> Result<(), ExportError> {
    let entries: Vec<ReportEntry<'_>> = reports
        .iter()
        .map(|(twin_world, report)| ReportEntry { twin_world, report })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &entries)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
