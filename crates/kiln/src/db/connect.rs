use crate::Result;

use kiln_core::{
    async_trait,
    driver::{Capability, Connection, Driver},
    Error,
};

use std::borrow::Cow;
use url::Url;

/// A driver picked from the scheme of a connection URL.
#[derive(Debug)]
pub struct Connect {
    driver: Box<dyn Driver>,
}

impl Connect {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;

        let driver = match url.scheme() {
            "sqlite" => connect_sqlite(&url)?,
            "postgresql" | "postgres" => connect_postgresql(&url)?,
            "mysql" => {
                return Err(Error::unsupported_feature(
                    "no MySQL driver is bundled; pass one to `Builder::build`",
                ))
            }
            scheme => {
                return Err(Error::invalid_connection_url(format!(
                    "unsupported database; scheme={scheme}; url={url}"
                )))
            }
        };

        Ok(Self { driver })
    }
}

#[async_trait]
impl Driver for Connect {
    fn url(&self) -> Cow<'_, str> {
        self.driver.url()
    }

    fn capability(&self) -> &'static Capability {
        self.driver.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect().await
    }

    fn max_connections(&self) -> Option<usize> {
        self.driver.max_connections()
    }

    async fn reset_db(&self) -> Result<()> {
        self.driver.reset_db().await
    }
}

#[cfg(feature = "postgresql")]
fn connect_postgresql(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(kiln_driver_postgresql::PostgreSQL::new(url.as_str())?))
}

#[cfg(not(feature = "postgresql"))]
fn connect_postgresql(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(Error::unsupported_feature("`postgresql` feature not enabled"))
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &Url) -> Result<Box<dyn Driver>> {
    Ok(Box::new(kiln_driver_sqlite::Sqlite::new(url.as_str())?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &Url) -> Result<Box<dyn Driver>> {
    Err(Error::unsupported_feature("`sqlite` feature not enabled"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = Connect::new("oracle://localhost/db").unwrap_err();
        assert!(err.is_invalid_connection_url());
    }

    #[test]
    fn mysql_has_no_bundled_driver() {
        let err = Connect::new("mysql://localhost/db").unwrap_err();
        assert!(err.is_unsupported_feature());
    }

    #[test]
    fn malformed_url() {
        let err = Connect::new("not a url").unwrap_err();
        assert!(err.is_invalid_connection_url());
    }
}
