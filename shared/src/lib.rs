pub mod error;
pub mod hash;

pub use error::HashError;
pub use hash::Hash256;

pub type Result<T> = std::result::Result<T, HashError>;
