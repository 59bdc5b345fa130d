//! Shader variable and interface block input model.
//!
//! These are produced by a front end (or deserialized from JSON) and are never
//! mutated by layout: traversal works on per-element copies.

use crate::bail_input;
use crate::error::Result;
use crate::types::VarType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest block the encoders can address: offsets are `i32` bytes.
const MAX_BLOCK_BYTES: u64 = i32::MAX as u64;
/// Upper bound on the bytes one leaf element takes under any packing rule:
/// a `mat4` (64) plus the alignment padding before it.
const MAX_LEAF_ELEMENT_BYTES: u64 = 80;
/// Upper bound on the padding added on entry to and exit from a structure.
const MAX_STRUCT_PADDING_BYTES: u64 = 32;

/// A possibly arrayed, possibly aggregate shader variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderVariable {
    pub name: String,
    /// Name used in emitted code; defaults to `name` when omitted.
    #[serde(default)]
    pub mapped_name: String,
    #[serde(rename = "type")]
    pub ty: VarType,
    /// Outermost dimension first. A zero entry is an unsized array.
    #[serde(default)]
    pub array_sizes: Vec<u32>,
    #[serde(default)]
    pub fields: Vec<ShaderVariable>,
    #[serde(default, rename = "row_major")]
    pub is_row_major_layout: bool,
    /// Flattened index of this element within the arrays it was indexed out of.
    #[serde(skip)]
    flattened_offset_in_parent_arrays: Option<u32>,
}

impl ShaderVariable {
    pub fn new(ty: VarType, name: impl Into<String>) -> Self {
        let name = name.into();
        ShaderVariable {
            mapped_name: name.clone(),
            name,
            ty,
            array_sizes: Vec::new(),
            fields: Vec::new(),
            is_row_major_layout: false,
            flattened_offset_in_parent_arrays: None,
        }
    }

    pub fn new_struct(name: impl Into<String>, fields: Vec<ShaderVariable>) -> Self {
        ShaderVariable {
            fields,
            ..ShaderVariable::new(VarType::Struct, name)
        }
    }

    pub fn with_array_sizes(mut self, sizes: &[u32]) -> Self {
        self.array_sizes = sizes.to_vec();
        self
    }

    pub fn with_mapped_name(mut self, mapped_name: impl Into<String>) -> Self {
        self.mapped_name = mapped_name.into();
        self
    }

    pub fn row_major(mut self) -> Self {
        self.is_row_major_layout = true;
        self
    }

    pub fn is_struct(&self) -> bool {
        self.ty.is_struct()
    }

    pub fn is_array(&self) -> bool {
        !self.array_sizes.is_empty()
    }

    pub fn is_array_of_arrays(&self) -> bool {
        self.array_sizes.len() > 1
    }

    /// Size at `dimension`, counted from the outermost. Unsized dimensions count as 1.
    pub fn nested_array_size(&self, dimension: usize) -> u32 {
        self.array_sizes[dimension].max(1)
    }

    pub fn outermost_array_size(&self) -> u32 {
        self.nested_array_size(0)
    }

    /// Product of all dimensions with unsized dimensions counted as 1.
    pub fn array_size_product(&self) -> u32 {
        self.array_sizes.iter().map(|s| (*s).max(1)).product()
    }

    /// True when this value is one element of an enclosing array that has
    /// already been indexed, so its name is already on the name stack.
    pub fn has_parent_array_index(&self) -> bool {
        self.flattened_offset_in_parent_arrays.is_some()
    }

    pub fn parent_array_index(&self) -> u32 {
        self.flattened_offset_in_parent_arrays.unwrap_or(0)
    }

    /// Turns this variable into element `index` of its outermost dimension.
    pub fn index_into_array(&mut self, index: u32) {
        assert!(self.is_array(), "indexing into non-array variable '{}'", self.name);
        let outer = self.outermost_array_size();
        self.flattened_offset_in_parent_arrays = Some(index + outer * self.parent_array_index());
        self.array_sizes.remove(0);
    }

    /// Fills empty mapped names with the plain name, recursively.
    pub fn fill_mapped_names(&mut self) {
        if self.mapped_name.is_empty() {
            self.mapped_name = self.name.clone();
        }
        for field in &mut self.fields {
            field.fill_mapped_names();
        }
    }

    /// Bytes this variable can take under the most wasteful packing rule.
    pub fn max_size_in_bytes(&self) -> u64 {
        let elements = self
            .array_sizes
            .iter()
            .fold(1u64, |acc, size| acc.saturating_mul(u64::from((*size).max(1))));
        let element_bytes = if self.is_struct() {
            self.fields
                .iter()
                .fold(MAX_STRUCT_PADDING_BYTES, |acc, field| acc.saturating_add(field.max_size_in_bytes()))
        } else {
            MAX_LEAF_ELEMENT_BYTES
        };
        elements.saturating_mul(element_bytes)
    }

    /// Checks the structural invariants the traversal relies on.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail_input!("Variable of type {} has no name", self.ty);
        }
        if self.is_struct() && self.fields.is_empty() {
            bail_input!("Struct '{}' has no fields", self.name);
        }
        if !self.is_struct() && !self.fields.is_empty() {
            bail_input!("Non-struct variable '{}' has fields", self.name);
        }
        if let Some(pos) = self.array_sizes.iter().skip(1).position(|s| *s == 0) {
            bail_input!(
                "Variable '{}' has an unsized array at dimension {}; only the outermost may be unsized",
                self.name,
                pos + 1
            );
        }
        for field in &self.fields {
            field.validate()?;
        }
        Ok(())
    }
}

/// Block storage layout qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStorage {
    #[default]
    Shared,
    Packed,
    Std140,
    Std430,
}

impl fmt::Display for BlockStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockStorage::Shared => "shared",
            BlockStorage::Packed => "packed",
            BlockStorage::Std140 => "std140",
            BlockStorage::Std430 => "std430",
        };
        f.write_str(s)
    }
}

/// A uniform or shader storage block declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceBlock {
    pub name: String,
    /// Instance name; members are prefixed with it when non-empty.
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub storage: BlockStorage,
    #[serde(default)]
    pub row_major: bool,
    pub fields: Vec<ShaderVariable>,
}

impl InterfaceBlock {
    pub fn new(name: impl Into<String>, storage: BlockStorage, fields: Vec<ShaderVariable>) -> Self {
        InterfaceBlock {
            name: name.into(),
            instance_name: String::new(),
            storage,
            row_major: false,
            fields,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            bail_input!("Block '{}' has no fields", self.name);
        }
        for field in &self.fields {
            field.validate()?;
        }
        let max_size = self
            .fields
            .iter()
            .fold(0u64, |acc, field| acc.saturating_add(field.max_size_in_bytes()));
        if max_size > MAX_BLOCK_BYTES {
            bail_input!(
                "Block '{}' may need up to {} bytes; blocks are limited to {} bytes",
                self.name,
                max_size,
                MAX_BLOCK_BYTES
            );
        }
        Ok(())
    }
}

/// Type of a single block field as seen by a backend: its leaf type, its own
/// array dimensions, the storage qualifier of the enclosing block and its
/// matrix packing.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockFieldType {
    pub ty: VarType,
    pub array_sizes: Vec<u32>,
    pub storage: BlockStorage,
    pub row_major: bool,
}

impl BlockFieldType {
    pub fn new(ty: VarType, storage: BlockStorage) -> Self {
        BlockFieldType {
            ty,
            array_sizes: Vec::new(),
            storage,
            row_major: false,
        }
    }

    /// Field type of `field` inside `block`. Row-major applies only to matrices.
    pub fn of_field(block: &InterfaceBlock, field: &ShaderVariable) -> Self {
        BlockFieldType {
            ty: field.ty,
            array_sizes: field.array_sizes.clone(),
            storage: block.storage,
            row_major: (block.row_major || field.is_row_major_layout) && field.ty.is_matrix(),
        }
    }
}
