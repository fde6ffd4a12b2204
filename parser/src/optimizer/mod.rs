pub use push_down_filters::*;

mod push_down_filters;
