pub mod dispose;
pub mod edit;
pub mod error;
pub mod position;
pub mod range;
pub mod scope;

pub use dispose::*;
pub use edit::*;
pub use error::*;
pub use position::*;
pub use range::*;
pub use scope::*;
