mod string;
pub use string::*;

mod types;
pub use types::*;

mod value;
pub use value::*;

mod linear;
pub use linear::*;
