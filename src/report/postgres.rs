//! Postgres-backed report store.
//!
//! Uses sqlx over a single connection. The database service hands out
//! connection strings in libpq `key=value` form, which are parsed here into
//! [`PgConnectOptions`].

use crate::report::{
    AuxiliaryRow, ImportRecord, NamedQuery, ReportError, ReportStore, Result, Row,
};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Connection, Row as _};
use tracing::debug;

/// A report store connected to the introspector's database.
pub struct PgReportStore {
    conn: PgConnection,
}

impl PgReportStore {
    /// Connect using a `key=value` connection string.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Connection`] if the string is malformed or the
    /// database cannot be reached.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let options = parse_dsn(connection_string)?;
        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| ReportError::Connection(e.to_string()))?;
        conn.ping()
            .await
            .map_err(|e| ReportError::Connection(e.to_string()))?;

        debug!("Connected to report database");
        Ok(Self { conn })
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ReportError::Connection(e.to_string()))
    }
}

/// Parse a libpq-style `key=value` connection string.
///
/// Recognises `host`, `port`, `user`, `password`, `dbname` and `sslmode`.
/// Values may be single-quoted, with `\'` and `\\` escapes.
///
/// # Errors
///
/// Returns [`ReportError::Connection`] on a malformed pair, a bad port, an
/// unsupported `sslmode`, or an unknown key.
pub fn parse_dsn(dsn: &str) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new();

    for (key, value) in dsn_pairs(dsn)? {
        options = match key.as_str() {
            "host" => options.host(&value),
            "port" => {
                let port = value.parse::<u16>().map_err(|_| {
                    ReportError::Connection(format!("invalid port {:?}", value))
                })?;
                options.port(port)
            }
            "user" => options.username(&value),
            "password" => options.password(&value),
            "dbname" => options.database(&value),
            "sslmode" => options.ssl_mode(ssl_mode(&value)?),
            other => {
                return Err(ReportError::Connection(format!(
                    "unsupported DSN key {:?}",
                    other
                )));
            }
        };
    }

    Ok(options)
}

/// Split a connection string into unquoted `(key, value)` pairs.
fn dsn_pairs(dsn: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = dsn.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return Ok(pairs);
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if key.is_empty() || chars.next() != Some('=') {
            return Err(ReportError::Connection(format!(
                "malformed DSN pair {:?}",
                key
            )));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            loop {
                match chars.next() {
                    Some('\'') => break,
                    Some('\\') => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    Some(c) => value.push(c),
                    None => {
                        return Err(ReportError::Connection(format!(
                            "unterminated quoted value for {:?}",
                            key
                        )));
                    }
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
        }

        pairs.push((key, value));
    }
}

fn ssl_mode(value: &str) -> Result<PgSslMode> {
    match value {
        "disable" => Ok(PgSslMode::Disable),
        "allow" => Ok(PgSslMode::Allow),
        "prefer" => Ok(PgSslMode::Prefer),
        "require" => Ok(PgSslMode::Require),
        "verify-ca" => Ok(PgSslMode::VerifyCa),
        "verify-full" => Ok(PgSslMode::VerifyFull),
        other => Err(ReportError::Connection(format!(
            "unsupported sslmode {:?}",
            other
        ))),
    }
}

fn query_error(query: &NamedQuery) -> impl FnOnce(sqlx::Error) -> ReportError {
    let name = query.name;
    move |source| ReportError::Query {
        query: name,
        source,
    }
}

fn accounts(row: &PgRow, column: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
    Ok(row
        .try_get::<Option<Vec<String>>, _>(column)?
        .unwrap_or_default())
}

fn exposure_row(row: &PgRow) -> std::result::Result<Row, sqlx::Error> {
    Ok(Row {
        arn: row.try_get("arn")?,
        service: row.try_get("service")?,
        provider_type: row.try_get("provider_type")?,
        in_org_accounts: accounts(row, "in_org_accounts")?,
        external_accounts: accounts(row, "external_accounts")?,
        is_public: row.try_get::<Option<bool>, _>("is_public")?.unwrap_or(false),
    })
}

fn auxiliary_row(row: &PgRow) -> std::result::Result<AuxiliaryRow, sqlx::Error> {
    Ok(AuxiliaryRow {
        arn: row.try_get("arn")?,
        is_public: row.try_get::<Option<bool>, _>("is_public")?.unwrap_or(false),
        in_org_accounts: accounts(row, "in_org_accounts")?,
        external_accounts: accounts(row, "external_accounts")?,
    })
}

#[async_trait::async_trait]
impl ReportStore for PgReportStore {
    async fn execute_script(&mut self, query: &NamedQuery) -> Result<()> {
        debug!("Running script {}", query.name);
        sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(query.sql))
            .await
            .map_err(query_error(query))?;
        Ok(())
    }

    async fn most_recent_import(&mut self, query: &NamedQuery) -> Result<Option<ImportRecord>> {
        let row = sqlx::query(query.sql)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(query_error(query))?;

        row.map(|row| -> std::result::Result<ImportRecord, sqlx::Error> {
            Ok(ImportRecord {
                end_date: row.try_get("end_date")?,
                organization: row.try_get("organization")?,
                arn: row.try_get("arn")?,
            })
        })
        .transpose()
        .map_err(query_error(query))
    }

    async fn exposure_rows(&mut self, query: &NamedQuery, account_id: &str) -> Result<Vec<Row>> {
        let rows = sqlx::query(query.sql)
            .bind(account_id)
            .fetch_all(&mut self.conn)
            .await
            .map_err(query_error(query))?;

        rows.iter()
            .map(exposure_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(query_error(query))
    }

    async fn auxiliary_rows(
        &mut self,
        query: &NamedQuery,
        account_id: &str,
    ) -> Result<Vec<AuxiliaryRow>> {
        let rows = sqlx::query(query.sql)
            .bind(account_id)
            .fetch_all(&mut self.conn)
            .await
            .map_err(query_error(query))?;

        rows.iter()
            .map(auxiliary_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(query_error(query))
    }
}
