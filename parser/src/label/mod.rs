pub use label_filter::*;
pub use label_filter_expr::*;

mod label_filter;
mod label_filter_expr;
