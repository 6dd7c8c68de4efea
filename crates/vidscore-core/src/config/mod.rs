pub mod page;

pub use page::{PageSpec, DEFAULT_DPI, MAX_DPI};
