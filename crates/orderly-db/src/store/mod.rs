//! # Stores
//!
//! One SQLite store per entity, each implementing its Storer trait from
//! `orderly-business`.
//!
//! ## Pool or Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.products()                 ProductStore { conn: Conn::Pool }        │
//! │       │                                                                 │
//! │       │  with_tx(&handle)      downcast handle ──► SqliteTx             │
//! │       ▼                                                                 │
//! │  rebound store                 ProductStore { conn: Conn::Tx }          │
//! │                                                                         │
//! │  Same SQL either way; only the connection differs.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Filters and ordering are assembled with [`QueryBuilder`]; every value is
//! a bound parameter and ORDER BY columns come from a fixed match.

pub mod product;
pub mod sale;
pub mod user;

pub use product::ProductStore;
pub use sale::SaleStore;
pub use user::UserStore;

use orderly_core::{Direction, Page};
use sqlx::{QueryBuilder, Sqlite};

/// Appends ` WHERE a AND b AND ...` one condition at a time.
pub(crate) struct Conditions<'b, 'args> {
    qb: &'b mut QueryBuilder<'args, Sqlite>,
    first: bool,
}

impl<'b, 'args> Conditions<'b, 'args> {
    pub(crate) fn new(qb: &'b mut QueryBuilder<'args, Sqlite>) -> Self {
        Self { qb, first: true }
    }

    /// Starts the next condition and returns the builder to write it.
    pub(crate) fn next(&mut self) -> &mut QueryBuilder<'args, Sqlite> {
        self.qb.push(if self.first { " WHERE " } else { " AND " });
        self.first = false;
        &mut *self.qb
    }
}

/// ` ORDER BY column DIR[, id ASC] LIMIT ? OFFSET ?`
///
/// Ties on a non-unique column are broken by `id_column` so pages never
/// overlap.
pub(crate) fn push_order_and_page(
    qb: &mut QueryBuilder<'_, Sqlite>,
    column: &'static str,
    id_column: &'static str,
    direction: Direction,
    page: &Page,
) {
    qb.push(" ORDER BY ")
        .push(column)
        .push(" ")
        .push(direction.as_sql());
    if column != id_column {
        qb.push(", ").push(id_column).push(" ASC");
    }

    qb.push(" LIMIT ")
        .push_bind(i64::from(page.rows_per_page()))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
}

/// Appended after a bound [`contains_pattern`].
pub(crate) const LIKE_ESCAPE: &str = " ESCAPE '\\'";

/// `%value%` for a LIKE substring match, with `%`, `_` and `\` in `value`
/// matched literally.
pub(crate) fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions_and_order() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM products");
        {
            let mut w = Conditions::new(&mut qb);
            w.next().push("name LIKE ").push_bind("%a%".to_string());
            w.next().push("price = ").push_bind(100_i64);
        }
        push_order_and_page(
            &mut qb,
            "price",
            "product_id",
            Direction::Desc,
            &Page::must_parse("2", "10"),
        );

        assert_eq!(
            qb.sql(),
            "SELECT * FROM products WHERE name LIKE ? AND price = ? \
             ORDER BY price DESC, product_id ASC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Pen"), "%Pen%");
        assert_eq!(contains_pattern("a_c"), r"%a\_c%");
        assert_eq!(contains_pattern("50%"), r"%50\%%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_order_by_id_has_no_tiebreak() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM sales");
        push_order_and_page(&mut qb, "sale_id", "sale_id", Direction::Asc, &Page::must_parse("1", "5"));
        assert_eq!(qb.sql(), "SELECT * FROM sales ORDER BY sale_id ASC LIMIT ? OFFSET ?");
    }
}
