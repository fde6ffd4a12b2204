pub use operator::*;
pub use utils::*;

mod operator;
mod utils;
