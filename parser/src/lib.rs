#![forbid(unsafe_code)]

pub mod ast;
pub mod binaryop;
pub mod common;
pub mod functions;
pub mod label;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod prettier;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::binaryop::*;
    pub use crate::common::*;
    pub use crate::functions::*;
    pub use crate::label::*;
    pub use crate::optimizer::*;
    pub use crate::parser::*;
    pub use crate::prettier::*;
}
