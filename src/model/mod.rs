pub mod parse;
pub mod quad;
pub mod value;

pub use quad::{Direction, Quad};
pub use value::{Value, ValueHash, HASH_SIZE};
