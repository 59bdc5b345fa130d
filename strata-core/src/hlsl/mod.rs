//! HLSL backend helpers that depend on block layout.
//!
//! Shader storage blocks are lowered to `RWByteAddressBuffer`s, so every
//! member access becomes a byte offset plus a call to a generated load/store
//! wrapper. Both the offsets and the wrapper bodies are computed with the
//! encoder selected by `hlsl_encoder_for_storage`.

pub mod ssbo_functions;


pub use ssbo_functions::{ShaderStorageBlockFunction, ShaderStorageBlockFunctions, SsboMethod};

use crate::error::Result;
use crate::layout::{BlockLayoutEncoder, BlockMemberInfo, RegisterEncoder, Std140Encoder};
use crate::names::encode_block_members;
use crate::variable::{BlockFieldType, BlockStorage, InterfaceBlock};
use indexmap::IndexMap;
use log::debug;

/// Encoder for a block laid out by the HLSL backend.
///
/// Only std140 has its own rule here; std430, shared and packed blocks all
/// use the register-packed rule until std430 is supported by this backend.
pub fn hlsl_encoder_for_storage(storage: BlockStorage) -> Box<dyn BlockLayoutEncoder> {
    match storage {
        BlockStorage::Std140 => Box::new(Std140Encoder::new()),
        BlockStorage::Std430 | BlockStorage::Shared | BlockStorage::Packed => Box::new(RegisterEncoder::new()),
    }
}

/// Byte stride between the columns (or rows, if row-major) of `field`, or
/// `-1` if it is not a matrix.
pub fn get_matrix_stride(field: &BlockFieldType) -> i32 {
    if !field.ty.is_matrix() {
        return -1;
    }
    let mut encoder = hlsl_encoder_for_storage(field.storage);
    let info = encoder.encode_type(&field.ty, &field.array_sizes, field.row_major);
    info.matrix_stride
}

/// Byte offsets of every active leaf of a shader storage block, in
/// declaration order, keyed by name relative to the block.
///
/// Leaves inside a top-level array member also get
/// `top_level_array_stride`: the distance between consecutive elements of
/// that member.
pub fn block_member_offsets(block: &InterfaceBlock) -> IndexMap<String, BlockMemberInfo> {
    let mut encoder = hlsl_encoder_for_storage(block.storage);
    let offsets: IndexMap<String, BlockMemberInfo> = encode_block_members(block, "", "", encoder.as_mut())
        .into_iter()
        .map(|member| (member.name, member.info))
        .collect();
    debug!("ssbo {}: {} active members", block.name, offsets.len());
    offsets
}

/// Registers a load and a store wrapper for every active leaf of `block`.
pub fn register_block_accesses(block: &InterfaceBlock, functions: &mut ShaderStorageBlockFunctions) -> Result<()> {
    let mut encoder = hlsl_encoder_for_storage(block.storage);
    for member in encode_block_members(block, "", "", encoder.as_mut()) {
        let info = &member.info;
        for method in [SsboMethod::Load, SsboMethod::Store] {
            functions.register_function(
                &member.variable.ty,
                method,
                info.is_row_major_matrix,
                info.matrix_stride,
                None,
            )?;
        }
    }
    Ok(())
}
