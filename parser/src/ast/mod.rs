pub use expr::*;
pub use interpolated_selector::*;
pub use string_expr::*;
pub use visitor::*;

mod expr;
mod interpolated_selector;
mod string_expr;
mod visitor;
