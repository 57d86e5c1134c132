//! Plain-text listing of report rows.

use crate::output::Result;
use crate::report::Report;
use std::io::Write;

/// Write one line per row, in report order.
pub fn write_rows<W: Write>(report: &Report, mut out: W) -> Result<()> {
    for row in &report.rows {
        writeln!(
            out,
            "Arn {} Service {} Resource {} Access {} Is Public {} External Accounts [{}] In-Org Accounts [{}]",
            row.arn,
            row.service,
            row.provider_type,
            row.access(),
            row.is_public,
            row.external_accounts.join(", "),
            row.in_org_accounts.join(", "),
        )?;
    }
    out.flush()?;
    Ok(())
}
