//! Shader sources and program construction.

mod compiler;
mod source;

pub use compiler::{ActiveProgram, build_program};
pub use source::{COLOR_ATTRIBUTE, MVP_UNIFORM, POSITION_ATTRIBUTE, ShaderSources};
