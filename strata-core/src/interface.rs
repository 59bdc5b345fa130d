//! Block layout reflection for JSON and text output.
//!
//! Reads interface block declarations, lays every block out and reports the
//! placement of each active member.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::Result;
use crate::layout::{BlockMemberInfo, LayoutRule};
use crate::names::encode_block_members;
use crate::variable::InterfaceBlock;

/// Complete layout report.
#[derive(Debug, Clone, Serialize)]
pub struct ShaderInterface {
    /// Report format version.
    pub version: String,
    pub blocks: Vec<BlockReflection>,
}

/// Layout of one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockReflection {
    pub name: String,
    /// Storage qualifier as declared (shared, packed, std140, std430).
    pub storage: String,
    /// Packing rule actually used.
    pub rule: String,
    /// Size in bytes, including end-of-block padding.
    pub size: usize,
    pub members: Vec<MemberReflection>,
}

/// Placement of one active leaf member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberReflection {
    pub name: String,
    pub mapped_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: i32,
    pub array_stride: i32,
    pub matrix_stride: i32,
    pub row_major: bool,
    pub top_level_array_stride: i32,
    /// Register and component, for register-packed blocks only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_element: Option<usize>,
}

#[derive(Deserialize)]
struct InterfaceInput {
    blocks: Vec<InterfaceBlock>,
}

/// Parses `{"blocks": [...]}`, fills default mapped names and validates.
pub fn parse_blocks(json: &str) -> Result<Vec<InterfaceBlock>> {
    let input: InterfaceInput = serde_json::from_str(json)?;
    let mut blocks = input.blocks;
    for block in &mut blocks {
        for field in &mut block.fields {
            field.fill_mapped_names();
        }
        block.validate()?;
    }
    Ok(blocks)
}

/// Lays out `block` with `rule` and reports its members in traversal order.
pub fn reflect_block(block: &InterfaceBlock, rule: LayoutRule) -> BlockReflection {
    let mut encoder = rule.create_encoder();
    let encoded = encode_block_members(block, &block.instance_name, &block.instance_name, encoder.as_mut());

    let with_registers = rule == LayoutRule::Packed;
    let members = encoded
        .into_iter()
        .map(|member| {
            let type_name = member.variable.ty.to_string();
            member_reflection(member.name, member.mapped_name, type_name, &member.info, with_registers)
        })
        .collect();

    BlockReflection {
        name: block.name.clone(),
        storage: block.storage.to_string(),
        rule: rule.to_string(),
        size: encoder.block_size(),
        members,
    }
}

fn member_reflection(
    name: String,
    mapped_name: String,
    type_name: String,
    info: &BlockMemberInfo,
    with_registers: bool,
) -> MemberReflection {
    MemberReflection {
        name,
        mapped_name,
        type_name,
        offset: info.offset,
        array_stride: info.array_stride,
        matrix_stride: info.matrix_stride,
        row_major: info.is_row_major_matrix,
        top_level_array_stride: info.top_level_array_stride,
        register: with_registers.then(|| info.block_register()),
        register_element: with_registers.then(|| info.block_register_element()),
    }
}

/// Reflects every block. `rule` forces one packing rule for all blocks;
/// `None` picks it from each block's storage qualifier.
pub fn extract_interface(blocks: &[InterfaceBlock], rule: Option<LayoutRule>) -> ShaderInterface {
    let blocks = blocks
        .iter()
        .map(|block| reflect_block(block, rule.unwrap_or_else(|| LayoutRule::for_storage(block.storage))))
        .collect();
    ShaderInterface {
        version: "1".to_string(),
        blocks,
    }
}

pub fn to_json(interface: &ShaderInterface) -> Result<String> {
    Ok(serde_json::to_string_pretty(interface)?)
}

pub fn to_text(interface: &ShaderInterface) -> String {
    let mut out = String::new();
    for block in &interface.blocks {
        writeln!(
            out,
            "block {} ({}, rule {}): {} bytes",
            block.name, block.storage, block.rule, block.size
        )
        .unwrap();
        for member in &block.members {
            write!(
                out,
                "  {:<24} {:<8} offset {:>5}  array_stride {:>4}  matrix_stride {:>3}",
                member.name, member.type_name, member.offset, member.array_stride, member.matrix_stride
            )
            .unwrap();
            if member.row_major {
                out.push_str("  row_major");
            }
            if let (Some(register), Some(element)) = (member.register, member.register_element) {
                write!(out, "  c{}.{}", register, "xyzw".as_bytes()[element] as char).unwrap();
            }
            out.push('\n');
        }
    }
    out
}
