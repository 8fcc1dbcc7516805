pub mod assembler;
pub mod parser;

pub use assembler::{assemble, AsmError, ErrorKind};
