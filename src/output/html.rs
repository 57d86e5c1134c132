//! HTML report.
//!
//! A single self-contained page: run metadata, a per-level summary, then one
//! table per access level with rows highlighted in the level's color.

use crate::report::{AccessLevel, Report, Row};
use chrono::{DateTime, TimeZone};

/// Lists longer than this are truncated in the HTML report.
const LIST_LIMIT: usize = 8;

/// Rendered in place of an empty account list.
const EMPTY_LIST: &str = "<NONE>";

pub fn render_html(report: &Report) -> String {
    let metadata = &report.metadata;
    let mut s = String::new();

    s.push_str("<!doctype html>\n<html><head><meta charset=\"utf-8\">");
    s.push_str("<title>rpCheckup report</title>");
    s.push_str("<style>body{font-family:system-ui,Helvetica,Arial,sans-serif;margin:24px;line-height:1.45}table{border-collapse:collapse;margin-bottom:24px}td,th{padding:6px 8px;border:1px solid #ddd;text-align:left}code{background:#f6f8fa;padding:2px 4px;border-radius:4px}h2{margin-top:28px}</style>");
    s.push_str("</head><body>");
    s.push_str("<h1>rpCheckup resource policy report</h1>");

    s.push_str("<p><b>Account:</b> <code>");
    s.push_str(&html_escape(&metadata.account_id));
    s.push_str("</code> <b>Organization:</b> <code>");
    s.push_str(&html_escape(metadata.organization_label()));
    s.push_str("</code></p>");
    s.push_str("<p><b>Imported:</b> ");
    s.push_str(&html_escape(&humanize(&metadata.imported_at)));
    s.push_str("<br><b>Generated:</b> ");
    s.push_str(&html_escape(&humanize(&metadata.generated_at)));
    s.push_str("</p>");

    s.push_str("<h2>Summary</h2><table><tr><th>Access Allows</th><th>Resources</th></tr>");
    for (level, count) in report.counts() {
        s.push_str(&format!(
            "<tr style=\"background-color:{}\"><td>{}</td><td>{}</td></tr>",
            level.color(),
            level.label(),
            count
        ));
    }
    s.push_str("</table>");

    for level in AccessLevel::ALL {
        let rows: Vec<&Row> = report.rows_at(level).collect();
        if rows.is_empty() {
            continue;
        }

        s.push_str(&format!("<h2>{}</h2>", level.label()));
        s.push_str("<table><tr><th>#</th><th>ARN</th><th>Service</th><th>Resource</th>");
        s.push_str("<th>In-Org Accounts</th><th>External Accounts</th><th>Public</th></tr>");
        for (i, row) in rows.iter().enumerate() {
            s.push_str(&format!(
                "<tr style=\"background-color:{}\">",
                row.access().color()
            ));
            s.push_str(&format!("<td>{}</td>", i + 1));
            s.push_str("<td><code>");
            s.push_str(&html_escape(&row.arn));
            s.push_str("</code></td><td>");
            s.push_str(&html_escape(&row.service));
            s.push_str("</td><td>");
            s.push_str(&html_escape(&row.provider_type));
            s.push_str("</td><td>");
            s.push_str(&html_escape(&account_list(&row.in_org_accounts)));
            s.push_str("</td><td>");
            s.push_str(&html_escape(&account_list(&row.external_accounts)));
            s.push_str("</td><td>");
            s.push_str(if row.is_public { "yes" } else { "no" });
            s.push_str("</td></tr>");
        }
        s.push_str("</table>");
    }

    s.push_str("</body></html>\n");
    s
}

/// `<NONE>` when empty, the first eight plus `...(+N)` when longer,
/// otherwise the list followed by its length.
pub fn account_list(accounts: &[String]) -> String {
    if accounts.is_empty() {
        return EMPTY_LIST.to_string();
    }
    if accounts.len() > LIST_LIMIT {
        return format!(
            "{}...(+{})",
            accounts[..LIST_LIMIT].join(", "),
            accounts.len() - LIST_LIMIT
        );
    }
    format!("{} ({})", accounts.join(", "), accounts.len())
}

/// RFC 1123 timestamp, e.g. `Mon, 02 Jan 2006 15:04:05 MST`.
pub fn humanize<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format("%a, %d %b %Y %H:%M:%S %Z").to_string()
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
