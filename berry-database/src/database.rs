use sqlx::{PgPool, migrate::Migrator};
use twilight_model::id::Id;

/// Compile-time discovered SQLx migrations for the `berry-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Shared database handle passed across crates.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a database handle from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Expose the underlying pool for query modules.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Snowflakes are stored in `BIGINT` columns bit-for-bit.
pub(crate) fn to_sql<T>(id: Id<T>) -> i64 {
    id.get() as i64
}

pub(crate) fn from_sql<T>(raw: i64) -> Option<Id<T>> {
    Id::new_checked(raw as u64)
}

pub(crate) fn ids_to_sql<T>(ids: &[Id<T>]) -> Vec<i64> {
    ids.iter().copied().map(to_sql).collect()
}

pub(crate) fn ids_from_sql<T>(raw: &[i64]) -> Vec<Id<T>> {
    raw.iter().copied().filter_map(from_sql).collect()
}

#[cfg(test)]
mod tests {
    use twilight_model::id::marker::UserMarker;

    use super::*;

    #[test]
    fn snowflakes_survive_bigint_storage() {
        let id: Id<UserMarker> = Id::new(u64::MAX);
        assert_eq!(from_sql::<UserMarker>(to_sql(id)), Some(id));
        assert_eq!(from_sql::<UserMarker>(0), None);
    }
}
