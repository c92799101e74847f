//! Query configuration handed to Domain Services at construction.

use orderly_core::order::OrderField;
use orderly_core::{OrderBy, OrderFields, PageLimits, QueryError};

/// Order allow-list plus default order for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingConfig<F> {
    pub fields: OrderFields<F>,
    pub default: OrderBy<F>,
}

impl<F: Copy> OrderingConfig<F> {
    pub fn new(fields: OrderFields<F>, default: OrderBy<F>) -> Self {
        Self { fields, default }
    }

    /// Parses a raw `order_by`, falling back to the default.
    pub fn parse(&self, raw: Option<&str>) -> Result<OrderBy<F>, QueryError> {
        OrderBy::parse(&self.fields, raw, self.default)
    }
}

impl<F: OrderField> Default for OrderingConfig<F> {
    fn default() -> Self {
        Self::new(F::allow_list(), F::default_order())
    }
}

/// Everything a Domain Service needs to read query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig<F> {
    pub ordering: OrderingConfig<F>,
    pub page_limits: PageLimits,
}

impl<F: OrderField> Default for QueryConfig<F> {
    fn default() -> Self {
        Self {
            ordering: OrderingConfig::default(),
            page_limits: PageLimits::default(),
        }
    }
}

impl<F> From<OrderingConfig<F>> for QueryConfig<F> {
    fn from(ordering: OrderingConfig<F>) -> Self {
        Self {
            ordering,
            page_limits: PageLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderly_core::order::{Direction, SaleOrderField};

    #[test]
    fn test_custom_ordering() {
        let config = OrderingConfig::new(
            OrderFields::new([("amount", SaleOrderField::Amount)]),
            OrderBy::new(SaleOrderField::CreatedAt, Direction::Desc),
        );

        assert_eq!(config.parse(None).unwrap().field, SaleOrderField::CreatedAt);
        assert_eq!(
            config.parse(Some("amount")).unwrap(),
            OrderBy::new(SaleOrderField::Amount, Direction::Asc)
        );
        assert!(config.parse(Some("sale_id")).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = QueryConfig::<SaleOrderField>::default();
        assert_eq!(config.page_limits.max_rows, 100);
        assert_eq!(config.ordering.default.field, SaleOrderField::Id);
    }
}
