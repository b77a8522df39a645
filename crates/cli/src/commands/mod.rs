pub mod decode;
pub mod languages;
pub mod util;

pub use decode::*;
pub use languages::*;
pub use util::*;
