pub mod extraction;
pub mod georeference;
pub mod rectangularization;
pub mod remap;

pub use extraction::*;
pub use georeference::*;
pub use rectangularization::*;
pub use remap::*;
