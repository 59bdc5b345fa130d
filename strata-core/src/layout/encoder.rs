//! Block layout encoders.
//!
//! An encoder is a cursor over a block's backing memory. Members are fed to
//! `encode_type` strictly in declaration/traversal order; each call aligns the
//! cursor according to the packing rule, snapshots the member's offset and
//! strides, and advances past it. The cursor is kept in 4-byte components and
//! converted to bytes only in the returned `BlockMemberInfo`.
//!
//! Rules implemented here:
//! - `Std140Encoder`: GLSL ES 3.0 "Standard Uniform Block Layout".
//! - `RegisterEncoder`: std140 leaf rules, but aggregates are aligned to the
//!   largest base alignment seen so far and are not re-rounded on exit. This
//!   is what register-addressed backends use for everything that is not
//!   std140.
//! - `Std430Encoder`: std140 with arrays, matrices and structures packed to
//!   their element alignment instead of a full register.
//! - `DummyEncoder`: computes nothing; used when only the traversal is needed.

use super::{BYTES_PER_COMPONENT, BlockMemberInfo, COMPONENTS_PER_REGISTER};
use crate::types::{VarType, component_alignment};
use log::trace;

/// Placement of one member, in components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberLayout {
    pub base_alignment: usize,
    pub array_stride: usize,
    pub matrix_stride: usize,
}

/// Cursor state shared by every encoder.
#[derive(Debug, Clone, Default)]
pub struct EncoderState {
    /// In components.
    current_offset: usize,
    /// Largest base alignment seen, in components.
    structure_base_alignment: usize,
}

impl EncoderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_offset(&self) -> usize {
        self.current_offset
    }

    /// Rounds the cursor up to a multiple of `alignment` components.
    pub fn align_to(&mut self, alignment: usize) {
        if alignment > 1 {
            self.current_offset = round_up(self.current_offset, alignment);
        }
    }

    pub fn advance(&mut self, components: usize) {
        self.current_offset += components;
    }

    fn note_base_alignment(&mut self, alignment: usize) {
        self.structure_base_alignment = self.structure_base_alignment.max(alignment);
    }
}

pub fn round_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

fn to_bytes(components: usize) -> i32 {
    i32::try_from(components * BYTES_PER_COMPONENT).expect("block offset exceeds i32 range")
}

fn array_size_product(array_sizes: &[u32]) -> usize {
    array_sizes.iter().map(|s| (*s).max(1) as usize).product()
}

/// A packing rule applied to a running cursor.
///
/// `member_layout`, `enter_aggregate_type` and `exit_aggregate_type` are the
/// rule hooks; everything else is shared.
pub trait BlockLayoutEncoder {
    fn state(&self) -> &EncoderState;

    fn state_mut(&mut self) -> &mut EncoderState;

    /// Base alignment and strides of a leaf member, in components.
    fn member_layout(&mut self, ty: &VarType, array_sizes: &[u32], is_row_major: bool) -> MemberLayout;

    /// Called when a struct instance starts.
    fn enter_aggregate_type(&mut self);

    /// Called when a struct instance ends.
    fn exit_aggregate_type(&mut self);

    /// Moves the cursor past a member that has just been placed.
    fn advance_offset(&mut self, ty: &VarType, array_sizes: &[u32], is_row_major: bool, layout: &MemberLayout) {
        let footprint = if !array_sizes.is_empty() {
            layout.array_stride * array_size_product(array_sizes)
        } else if ty.is_matrix() {
            layout.matrix_stride * ty.matrix_register_count(is_row_major)
        } else {
            ty.component_count()
        };
        self.state_mut().advance(footprint);
    }

    /// Places the next member of the block.
    ///
    /// `array_sizes` holds the member's own (innermost) array dimensions.
    /// Panics on struct and sampler types, which have no leaf storage.
    fn encode_type(&mut self, ty: &VarType, array_sizes: &[u32], is_row_major: bool) -> BlockMemberInfo {
        assert!(
            !ty.is_struct() && !ty.is_sampler(),
            "encode_type called with non-storage type {}",
            ty
        );

        let layout = self.member_layout(ty, array_sizes, is_row_major);
        self.state_mut().align_to(layout.base_alignment);

        let info = BlockMemberInfo::new(
            to_bytes(self.state().current_offset()),
            if array_sizes.is_empty() { -1 } else { to_bytes(layout.array_stride) },
            if ty.is_matrix() { to_bytes(layout.matrix_stride) } else { -1 },
            is_row_major,
        );

        self.advance_offset(ty, array_sizes, is_row_major, &layout);
        trace!(
            "encoded {}{:?} at {} (array stride {}, matrix stride {})",
            ty, array_sizes, info.offset, info.array_stride, info.matrix_stride
        );
        info
    }

    /// Cursor position in bytes, without any end-of-block rounding.
    fn current_offset(&self) -> usize {
        self.state().current_offset() * BYTES_PER_COMPONENT
    }

    /// Size of everything encoded so far, in bytes, including the rule's
    /// end-of-block padding.
    fn block_size(&self) -> usize {
        self.current_offset()
    }

    /// Reserves `offset_in_bytes` bytes at the cursor.
    fn increase_current_offset(&mut self, offset_in_bytes: usize) {
        self.state_mut().advance(offset_in_bytes / BYTES_PER_COMPONENT);
    }

    /// In components.
    fn structure_base_alignment(&self) -> usize {
        self.state().structure_base_alignment
    }

    fn set_structure_base_alignment(&mut self, base_alignment: usize) {
        self.state_mut().structure_base_alignment = base_alignment;
    }
}

fn std140_member_layout(ty: &VarType, array_sizes: &[u32], is_row_major: bool) -> MemberLayout {
    if ty.is_matrix() {
        let array_stride = if array_sizes.is_empty() {
            0
        } else {
            COMPONENTS_PER_REGISTER * ty.matrix_register_count(is_row_major)
        };
        MemberLayout {
            base_alignment: COMPONENTS_PER_REGISTER,
            array_stride,
            matrix_stride: COMPONENTS_PER_REGISTER,
        }
    } else if !array_sizes.is_empty() {
        MemberLayout {
            base_alignment: COMPONENTS_PER_REGISTER,
            array_stride: COMPONENTS_PER_REGISTER,
            matrix_stride: 0,
        }
    } else {
        MemberLayout {
            base_alignment: component_alignment(ty.component_count()),
            array_stride: 0,
            matrix_stride: 0,
        }
    }
}

/// std140 layout ("Standard Uniform Block Layout", GLSL ES 3.00 §2.11.6).
#[derive(Debug, Clone, Default)]
pub struct Std140Encoder {
    state: EncoderState,
}

impl Std140Encoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockLayoutEncoder for Std140Encoder {
    fn state(&self) -> &EncoderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EncoderState {
        &mut self.state
    }

    fn member_layout(&mut self, ty: &VarType, array_sizes: &[u32], is_row_major: bool) -> MemberLayout {
        std140_member_layout(ty, array_sizes, is_row_major)
    }

    fn enter_aggregate_type(&mut self) {
        self.state.align_to(COMPONENTS_PER_REGISTER);
    }

    fn exit_aggregate_type(&mut self) {
        self.state.align_to(COMPONENTS_PER_REGISTER);
    }

    fn block_size(&self) -> usize {
        round_up(self.state.current_offset(), COMPONENTS_PER_REGISTER) * BYTES_PER_COMPONENT
    }
}

/// Register-packed layout for 4-component register addressed backends.
///
/// Leaf members follow std140. A struct starts at the largest base alignment
/// recorded so far and its end is not padded.
#[derive(Debug, Clone, Default)]
pub struct RegisterEncoder {
    state: EncoderState,
}

impl RegisterEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockLayoutEncoder for RegisterEncoder {
    fn state(&self) -> &EncoderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EncoderState {
        &mut self.state
    }

    fn member_layout(&mut self, ty: &VarType, array_sizes: &[u32], is_row_major: bool) -> MemberLayout {
        let layout = std140_member_layout(ty, array_sizes, is_row_major);
        self.state.note_base_alignment(layout.base_alignment);
        layout
    }

    fn enter_aggregate_type(&mut self) {
        let alignment = self.state.structure_base_alignment;
        self.state.align_to(alignment);
    }

    fn exit_aggregate_type(&mut self) {}
}

/// std430 layout: std140 without rounding arrays, matrices and structures up
/// to a full register.
#[derive(Debug, Clone, Default)]
pub struct Std430Encoder {
    state: EncoderState,
}

impl Std430Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_structure_boundary(&mut self) {
        let alignment = self.state.structure_base_alignment;
        self.state.align_to(alignment);
    }
}

impl BlockLayoutEncoder for Std430Encoder {
    fn state(&self) -> &EncoderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EncoderState {
        &mut self.state
    }

    fn member_layout(&mut self, ty: &VarType, array_sizes: &[u32], is_row_major: bool) -> MemberLayout {
        let layout = if ty.is_matrix() {
            let base_alignment = component_alignment(ty.matrix_component_count(is_row_major));
            let array_stride = if array_sizes.is_empty() {
                0
            } else {
                base_alignment * ty.matrix_register_count(is_row_major)
            };
            MemberLayout {
                base_alignment,
                array_stride,
                matrix_stride: base_alignment,
            }
        } else {
            let base_alignment = component_alignment(ty.component_count());
            MemberLayout {
                base_alignment,
                array_stride: if array_sizes.is_empty() { 0 } else { base_alignment },
                matrix_stride: 0,
            }
        };
        self.state.note_base_alignment(layout.base_alignment);
        layout
    }

    fn enter_aggregate_type(&mut self) {
        self.next_structure_boundary();
    }

    fn exit_aggregate_type(&mut self) {
        self.next_structure_boundary();
    }

    fn block_size(&self) -> usize {
        let alignment = self.state.structure_base_alignment.max(1);
        round_up(self.state.current_offset(), alignment) * BYTES_PER_COMPONENT
    }
}

/// Encoder that lays nothing out: every member is at offset 0 with zero
/// strides and the cursor never moves.
#[derive(Debug, Clone, Default)]
pub struct DummyEncoder {
    state: EncoderState,
}

impl DummyEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockLayoutEncoder for DummyEncoder {
    fn state(&self) -> &EncoderState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EncoderState {
        &mut self.state
    }

    fn member_layout(&mut self, _ty: &VarType, _array_sizes: &[u32], _is_row_major: bool) -> MemberLayout {
        MemberLayout::default()
    }

    fn enter_aggregate_type(&mut self) {}

    fn exit_aggregate_type(&mut self) {}

    fn advance_offset(&mut self, _ty: &VarType, _array_sizes: &[u32], _is_row_major: bool, _layout: &MemberLayout) {}

    fn encode_type(&mut self, _ty: &VarType, _array_sizes: &[u32], is_row_major: bool) -> BlockMemberInfo {
        BlockMemberInfo::new(0, 0, 0, is_row_major)
    }
}
