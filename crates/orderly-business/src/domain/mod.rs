//! Domain Services, one per entity.
//!
//! Each service owns a storer trait object and its query configuration.
//! `with_tx` returns a new service whose storer is bound to a transaction;
//! the original keeps working outside it.

pub mod product;
pub mod sale;
pub mod user;

use crate::config::OrderingConfig;
use crate::error::BusError;
use orderly_core::{FieldErrors, OrderBy, Page, PageLimits, QueryError};

/// Parses paging input, reporting failures under `page` or `rows`.
pub(crate) fn parse_page(
    limits: PageLimits,
    page: Option<&str>,
    rows: Option<&str>,
) -> Result<Page, BusError> {
    Page::parse_with(limits, page, rows).map_err(|err| {
        let field = match err {
            QueryError::InvalidRows(_) | QueryError::RowsOutOfRange { .. } => "rows",
            _ => "page",
        };
        FieldErrors::single(field, err).into()
    })
}

/// Parses `order_by`, reporting failures under that name.
pub(crate) fn parse_order<F: Copy>(
    ordering: &OrderingConfig<F>,
    raw: Option<&str>,
) -> Result<OrderBy<F>, BusError> {
    ordering
        .parse(raw)
        .map_err(|err| FieldErrors::single("order_by", err).into())
}
