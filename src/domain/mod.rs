pub mod builder;
pub mod component;
pub mod document;
pub mod parser;
pub mod watch;

pub use builder::*;
pub use component::*;
pub use document::*;
pub use parser::*;
pub use watch::*;
