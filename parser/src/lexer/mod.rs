mod duration;
mod lexer;
mod number;
mod utils;

pub use duration::{duration_value, positive_duration_value};
pub(crate) use duration::is_positive_duration;
pub use lexer::Lexer;
pub use number::{parse_number, parse_positive_number};
pub use utils::{append_escaped_ident, escape_ident, extract_string_value, quote, unescape_ident};
pub(crate) use utils::{is_ident_prefix, is_inf_or_nan, is_positive_number_prefix, is_string_prefix};
