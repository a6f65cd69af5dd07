//! Terminal output helpers: device tables, status lines, batch reports.

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use gantry_core::{BatchReport, DeviceRecord};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Port")]
    port: u16,
}

impl From<&DeviceRecord> for DeviceRow {
    fn from(r: &DeviceRecord) -> Self {
        Self {
            name: r.name.clone(),
            address: r.address.clone(),
            port: r.port,
        }
    }
}

pub fn print_devices(records: &[DeviceRecord]) {
    let rows: Vec<DeviceRow> = records.iter().map(DeviceRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Green phase banner, the way the stages' operators expect them.
pub fn status(message: &str) {
    println!("{}", message.green());
}

/// Print per-device failures from a batch operation, if any.
pub fn print_report(operation: &str, report: &BatchReport) {
    for (device, error) in report.failures() {
        eprintln!("{} {device}: {error}", format!("{operation} failed on").red());
    }
}
