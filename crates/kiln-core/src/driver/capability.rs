/// The SQL backend a driver talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Sqlite,
    Postgresql,
    Mysql,
}

#[derive(Debug)]
pub struct Capability {
    pub provider: Provider,

    /// Supports `RETURNING` on INSERT, UPDATE and DELETE.
    pub returning: bool,

    /// Supports `LIMIT` on UPDATE and DELETE.
    pub update_limit: bool,

    /// Supports `SELECT DISTINCT ON (...)`.
    pub distinct_on: bool,

    /// Supports the `DEFAULT` keyword inside a multi-row VALUES list.
    pub default_in_bulk_insert: bool,

    /// Stores list fields as native arrays instead of JSON.
    pub native_arrays: bool,

    /// Supports `ILIKE`.
    pub ilike: bool,

    /// Supports `NULLS FIRST` / `NULLS LAST` in ORDER BY.
    pub nulls_ordering: bool,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        provider: Provider::Sqlite,
        returning: true,
        update_limit: false,
        distinct_on: false,
        default_in_bulk_insert: false,
        native_arrays: false,
        ilike: false,
        nulls_ordering: true,
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        provider: Provider::Postgresql,
        distinct_on: true,
        default_in_bulk_insert: true,
        native_arrays: true,
        ilike: true,
        ..Self::SQLITE
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        provider: Provider::Mysql,
        returning: false,
        update_limit: true,
        default_in_bulk_insert: true,
        nulls_ordering: false,
        ..Self::SQLITE
    };

    pub fn for_provider(provider: Provider) -> &'static Capability {
        match provider {
            Provider::Sqlite => &Self::SQLITE,
            Provider::Postgresql => &Self::POSTGRESQL,
            Provider::Mysql => &Self::MYSQL,
        }
    }
}
