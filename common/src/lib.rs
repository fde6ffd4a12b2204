pub mod hash;
pub mod regex_util;

pub mod prelude {
    pub use crate::hash::*;
    pub use crate::regex_util::*;
}
