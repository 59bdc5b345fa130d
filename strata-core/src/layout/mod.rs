//! Block member layout: offsets, array strides and matrix strides of the
//! members of uniform and shader storage blocks.

pub mod encoder;


pub use encoder::{
    BlockLayoutEncoder, DummyEncoder, EncoderState, MemberLayout, RegisterEncoder, Std140Encoder,
    Std430Encoder, round_up,
};

use crate::names::{BlockLayoutMapSink, block_encoder_visitor};
use crate::variable::{BlockStorage, InterfaceBlock, ShaderVariable};
use crate::visitor::traverse_shader_variables;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const BYTES_PER_COMPONENT: usize = 4;
pub const COMPONENTS_PER_REGISTER: usize = 4;

/// Layout of one active leaf variable of a block. Strides are `-1` when the
/// variable is not an array / not a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockMemberInfo {
    /// Byte offset from the start of the block.
    pub offset: i32,
    /// Byte stride between array elements.
    pub array_stride: i32,
    /// Byte stride between columns of a column-major matrix or rows of a
    /// row-major matrix.
    pub matrix_stride: i32,
    pub is_row_major_matrix: bool,
    /// Stride of the top-level shader storage block array containing this
    /// variable. Never set by an encoder.
    pub top_level_array_stride: i32,
}

/// "No information": never stored in a layout map.
pub const DEFAULT_BLOCK_MEMBER_INFO: BlockMemberInfo = BlockMemberInfo {
    offset: -1,
    array_stride: -1,
    matrix_stride: -1,
    is_row_major_matrix: false,
    top_level_array_stride: -1,
};

impl BlockMemberInfo {
    pub const fn new(offset: i32, array_stride: i32, matrix_stride: i32, is_row_major_matrix: bool) -> Self {
        BlockMemberInfo {
            offset,
            array_stride,
            matrix_stride,
            is_row_major_matrix,
            top_level_array_stride: -1,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == DEFAULT_BLOCK_MEMBER_INFO
    }

    /// Index of the 4-component register holding the start of this member.
    pub fn block_register(&self) -> usize {
        (self.offset as usize / BYTES_PER_COMPONENT) / COMPONENTS_PER_REGISTER
    }

    /// Component within `block_register()` where this member starts.
    pub fn block_register_element(&self) -> usize {
        (self.offset as usize / BYTES_PER_COMPONENT) % COMPONENTS_PER_REGISTER
    }
}

impl Default for BlockMemberInfo {
    fn default() -> Self {
        DEFAULT_BLOCK_MEMBER_INFO
    }
}

/// Fully qualified member name to layout, ordered by name.
pub type BlockLayoutMap = BTreeMap<String, BlockMemberInfo>;

/// Packing rule selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutRule {
    Std140,
    Std430,
    /// Register-packed.
    Packed,
    Dummy,
}

impl LayoutRule {
    /// Rule used for reflection of a block with the given storage qualifier.
    pub fn for_storage(storage: BlockStorage) -> Self {
        match storage {
            BlockStorage::Std140 => LayoutRule::Std140,
            BlockStorage::Std430 => LayoutRule::Std430,
            BlockStorage::Shared | BlockStorage::Packed => LayoutRule::Packed,
        }
    }

    pub fn create_encoder(self) -> Box<dyn BlockLayoutEncoder> {
        match self {
            LayoutRule::Std140 => Box::new(Std140Encoder::new()),
            LayoutRule::Std430 => Box::new(Std430Encoder::new()),
            LayoutRule::Packed => Box::new(RegisterEncoder::new()),
            LayoutRule::Dummy => Box::new(DummyEncoder::new()),
        }
    }
}

impl fmt::Display for LayoutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayoutRule::Std140 => "std140",
            LayoutRule::Std430 => "std430",
            LayoutRule::Packed => "packed",
            LayoutRule::Dummy => "dummy",
        };
        f.write_str(s)
    }
}

pub fn encoder_for_storage(storage: BlockStorage) -> Box<dyn BlockLayoutEncoder> {
    LayoutRule::for_storage(storage).create_encoder()
}

/// Lays out `fields` with `encoder` and records every leaf in `block_info_out`
/// under its fully qualified name, prefixed with `prefix.` when `prefix` is
/// not empty.
pub fn get_interface_block_info(
    fields: &[ShaderVariable],
    prefix: &str,
    encoder: &mut dyn BlockLayoutEncoder,
    in_row_major_layout: bool,
    block_info_out: &mut BlockLayoutMap,
) {
    let mut visitor = block_encoder_visitor(prefix, prefix, encoder, BlockLayoutMapSink::new(block_info_out));
    traverse_shader_variables(fields, in_row_major_layout, &mut visitor);
}

/// Lays out the default uniform block. Uniforms are never row-major at the
/// block level.
pub fn get_uniform_block_info(
    uniforms: &[ShaderVariable],
    prefix: &str,
    encoder: &mut dyn BlockLayoutEncoder,
    block_info_out: &mut BlockLayoutMap,
) {
    get_interface_block_info(uniforms, prefix, encoder, false, block_info_out);
}

/// Complete layout of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub size: usize,
    pub members: BlockLayoutMap,
}

impl InterfaceBlock {
    /// Lays out every member with a fresh encoder for `rule`.
    pub fn compute_layout(&self, rule: LayoutRule) -> BlockLayout {
        let mut encoder = rule.create_encoder();
        let mut members = BlockLayoutMap::new();
        get_interface_block_info(
            &self.fields,
            &self.instance_name,
            encoder.as_mut(),
            self.row_major,
            &mut members,
        );
        let size = encoder.block_size();
        debug!("block {} ({}): {} members, {} bytes", self.name, rule, members.len(), size);
        BlockLayout { size, members }
    }
}
