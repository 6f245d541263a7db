//! Prometheus exposition text parsing
//!
//! Turns the body of a `/metrics` response into samples grouped by metric
//! name. The parser is intentionally lenient: it never fails, it skips what
//! it cannot split and reads unparsable values as `0`.
//!
//! ```rust
//! let set = tees_metrics_text::parse(
//!     "# HELP foo_total Requests\nfoo_total{path=\"/a\"} 5\nfoo_total{path=\"/b\"} 7\n",
//! );
//! assert_eq!(set.sum("foo_total"), Some(12.0));
//! ```
#![forbid(unsafe_code)]

mod parser;
mod set;

pub use parser::{parse, parse_line};
pub use set::{MetricSample, MetricSet};
