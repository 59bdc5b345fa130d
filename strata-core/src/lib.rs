pub mod error;
pub mod hlsl;
pub mod interface;
pub mod layout;
pub mod names;
pub mod types;
pub mod variable;
pub mod visitor;

#[cfg(test)]
mod interface_tests;
#[cfg(test)]
mod names_tests;

pub use error::{CompilerError, Result};
pub use layout::{BlockLayout, BlockLayoutEncoder, BlockLayoutMap, BlockMemberInfo, LayoutRule};
pub use types::{BasicType, SamplerKind, VarType};
pub use variable::{BlockFieldType, BlockStorage, InterfaceBlock, ShaderVariable};
pub use visitor::{ShaderVariableVisitor, traverse_shader_variable, traverse_shader_variables};
