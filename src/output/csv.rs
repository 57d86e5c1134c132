//! CSV report.

use crate::output::Result;
use crate::report::Report;
use std::io::Write;

pub const HEADER: [&str; 7] = [
    "ARN",
    "Service",
    "Resource",
    "Access Allows",
    "In-Org Accounts",
    "External Accounts",
    "Is Public",
];

/// Write one record per row, in report order, after [`HEADER`].
pub fn write_csv<W: Write>(report: &Report, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    for row in &report.rows {
        writer.write_record([
            row.arn.as_str(),
            row.service.as_str(),
            row.provider_type.as_str(),
            row.access().label(),
            row.in_org_accounts.join(", ").as_str(),
            row.external_accounts.join(", ").as_str(),
            if row.is_public { "true" } else { "false" },
        ])?;
    }

    writer.flush()?;
    Ok(())
}
