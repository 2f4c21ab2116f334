pub mod error;
pub mod image;
pub mod machine;
pub mod opcode;

pub mod prelude {
    pub use crate::error::{LoadError, RuntimeError};
    pub use crate::image::Image;
    pub use crate::machine::Machine;
    pub use crate::opcode::Op;
}
