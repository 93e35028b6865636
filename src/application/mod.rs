pub mod executable;
pub mod ports;
pub mod registry;

pub use executable::*;
pub use ports::*;
pub use registry::*;
