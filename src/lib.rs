pub mod bytecode;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod program;
pub mod value;

pub use cpu::{Cpu, CpuConfig, Frame, Trap};
pub use program::{Program, ProgramBuilder};
pub use value::Value;
