//! Postgres-backed units of work.

use std::fmt;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::{
    database::Db,
    errors::StoreError,
    store::{Store, UnitOfWork},
};

#[derive(Debug, Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.db.begin().await?;

        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// `term` as an `ILIKE ... ESCAPE '\'` pattern matching it anywhere.
///
/// Wildcards typed by the user match literally.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');

    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }

    pattern.push('%');
    pattern
}

/// A unit of work over one Postgres transaction.
///
/// Repository traits are implemented for this type next to their SQL in each
/// domain module.
pub struct PgUnitOfWork {
    pub(crate) tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgUnitOfWork").finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_terms_match_anywhere() {
        assert_eq!(contains_pattern("save"), "%save%");
    }

    #[test]
    fn typed_wildcards_are_escaped() {
        assert_eq!(contains_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
