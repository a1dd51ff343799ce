//! Built-in SQL adapters

use strata_types::Connector;

use super::traits::Adapter;

/// Dialect adapter for one of the known connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlAdapter {
    connector: Connector,
}

impl SqlAdapter {
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> Connector {
        self.connector
    }

    fn quote_char(&self) -> char {
        match self.connector {
            Connector::Postgres | Connector::Redshift | Connector::Snowflake => '"',
            Connector::Bigquery => '`',
        }
    }
}

impl Adapter for SqlAdapter {
    fn type_key(&self) -> &str {
        self.connector.type_key()
    }

    fn date_function(&self) -> &str {
        match self.connector {
            Connector::Postgres => "now()",
            Connector::Redshift => "getdate()",
            Connector::Snowflake | Connector::Bigquery => "CURRENT_TIMESTAMP()",
        }
    }

    fn quote(&self, identifier: &str) -> String {
        let q = self.quote_char();
        let escaped = identifier.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(SqlAdapter::new(Connector::Postgres).quote("my table"), "\"my table\"");
        assert_eq!(SqlAdapter::new(Connector::Snowflake).quote("a\"b"), "\"a\"\"b\"");
        assert_eq!(SqlAdapter::new(Connector::Bigquery).quote("events"), "`events`");
    }

    #[test]
    fn test_date_functions() {
        assert_eq!(SqlAdapter::new(Connector::Postgres).date_function(), "now()");
        assert_eq!(SqlAdapter::new(Connector::Redshift).date_function(), "getdate()");
        assert_eq!(
            SqlAdapter::new(Connector::Bigquery).date_function(),
            "CURRENT_TIMESTAMP()"
        );
        assert_eq!(SqlAdapter::new(Connector::Snowflake).type_key(), "snowflake");
    }
}
