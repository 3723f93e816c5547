//! Pagination module
//!
//! Lazily walks `Link`-header result pages starting from an initial
//! response. Pages are fetched on demand, kept for rewinding, and a
//! transient page-fetch failure leaves the cursor retryable instead of
//! ending iteration.

mod paginator;

pub use paginator::{Paginator, PER_PAGE_MAX};
