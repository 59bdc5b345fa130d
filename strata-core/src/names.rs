//! Fully qualified names for traversed variables.
//!
//! `VariableNameVisitor` tracks the name path (`a.b[2].c`) of the current
//! position in a traversal and hands every leaf, together with its resolved
//! plain and mapped names, to an inner `NamedVariableVisitor`.
//! `BlockEncoderVisitor` is such an inner visitor: it drives a
//! `BlockLayoutEncoder` and passes each computed `BlockMemberInfo` on to an
//! `EncodeVariable` sink.

use crate::layout::{BlockLayoutEncoder, BlockLayoutMap, BlockMemberInfo};
use crate::variable::{InterfaceBlock, ShaderVariable};
use crate::visitor::{ShaderVariableVisitor, traverse_shader_variable};

/// Leaf-level hooks with resolved names.
pub trait NamedVariableVisitor {
    fn enter_struct_access(&mut self, _struct_var: &ShaderVariable, _is_row_major: bool) {}

    fn exit_struct_access(&mut self, _struct_var: &ShaderVariable, _is_row_major: bool) {}

    fn visit_named_sampler(&mut self, _sampler: &ShaderVariable, _name: &str, _mapped_name: &str) {}

    fn visit_named_variable(
        &mut self,
        variable: &ShaderVariable,
        is_row_major: bool,
        name: &str,
        mapped_name: &str,
    );
}

/// Maintains the plain and mapped name stacks.
#[derive(Debug)]
pub struct VariableNameVisitor<V> {
    name_stack: Vec<String>,
    mapped_name_stack: Vec<String>,
    // Entries below these depths are the prefixes and are never popped.
    name_base: usize,
    mapped_name_base: usize,
    inner: V,
}

impl<V: NamedVariableVisitor> VariableNameVisitor<V> {
    pub fn new(name_prefix: &str, mapped_name_prefix: &str, inner: V) -> Self {
        let mut name_stack = Vec::new();
        let mut mapped_name_stack = Vec::new();
        if !name_prefix.is_empty() {
            name_stack.push(format!("{}.", name_prefix));
        }
        if !mapped_name_prefix.is_empty() {
            mapped_name_stack.push(format!("{}.", mapped_name_prefix));
        }
        VariableNameVisitor {
            name_base: name_stack.len(),
            mapped_name_base: mapped_name_stack.len(),
            name_stack,
            mapped_name_stack,
            inner,
        }
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }

    /// Panics if a traversal left the stacks unbalanced.
    pub fn into_inner(self) -> V {
        assert_eq!(self.name_stack.len(), self.name_base, "unbalanced name stack");
        assert_eq!(self.mapped_name_stack.len(), self.mapped_name_base, "unbalanced mapped name stack");
        self.inner
    }

    fn push(&mut self, name: &str, mapped_name: &str) {
        self.name_stack.push(name.to_string());
        self.mapped_name_stack.push(mapped_name.to_string());
    }

    fn pop(&mut self) {
        assert!(
            self.name_stack.len() > self.name_base && self.mapped_name_stack.len() > self.mapped_name_base,
            "name stack popped past its prefix"
        );
        self.name_stack.pop();
        self.mapped_name_stack.pop();
    }

    /// Pushes the leaf's own name unless an enclosing array already did,
    /// collapses both stacks and restores them.
    fn resolve_leaf_names(&mut self, variable: &ShaderVariable) -> (String, String) {
        let owns_name = !variable.has_parent_array_index();
        if owns_name {
            self.push(&variable.name, &variable.mapped_name);
        }
        let names = (self.name_stack.concat(), self.mapped_name_stack.concat());
        if owns_name {
            self.pop();
        }
        names
    }
}

impl<V: NamedVariableVisitor> ShaderVariableVisitor for VariableNameVisitor<V> {
    fn enter_struct(&mut self, struct_var: &ShaderVariable) {
        self.push(&struct_var.name, &struct_var.mapped_name);
    }

    fn exit_struct(&mut self, _struct_var: &ShaderVariable) {
        self.pop();
    }

    fn enter_struct_access(&mut self, struct_var: &ShaderVariable, is_row_major: bool) {
        self.push(".", ".");
        self.inner.enter_struct_access(struct_var, is_row_major);
    }

    fn exit_struct_access(&mut self, struct_var: &ShaderVariable, is_row_major: bool) {
        self.inner.exit_struct_access(struct_var, is_row_major);
        self.pop();
    }

    // Struct arrays already pushed their name in enter_struct.
    fn enter_array(&mut self, array_var: &ShaderVariable) {
        if !array_var.has_parent_array_index() && !array_var.is_struct() {
            self.push(&array_var.name, &array_var.mapped_name);
        }
    }

    fn exit_array(&mut self, array_var: &ShaderVariable) {
        if !array_var.has_parent_array_index() && !array_var.is_struct() {
            self.pop();
        }
    }

    fn enter_array_element(&mut self, _array_var: &ShaderVariable, array_element: u32) {
        let element = format!("[{}]", array_element);
        self.push(&element, &element);
    }

    fn exit_array_element(&mut self, _array_var: &ShaderVariable, _array_element: u32) {
        self.pop();
    }

    fn visit_sampler(&mut self, sampler: &ShaderVariable) {
        let (name, mapped_name) = self.resolve_leaf_names(sampler);
        self.inner.visit_named_sampler(sampler, &name, &mapped_name);
    }

    fn visit_variable(&mut self, variable: &ShaderVariable, is_row_major: bool) {
        let (name, mapped_name) = self.resolve_leaf_names(variable);
        self.inner.visit_named_variable(variable, is_row_major, &name, &mapped_name);
    }
}

/// Receives the layout of every encoded leaf.
pub trait EncodeVariable {
    fn encode_variable(
        &mut self,
        variable: &ShaderVariable,
        variable_info: &BlockMemberInfo,
        name: &str,
        mapped_name: &str,
    );
}

/// Feeds leaves to a block encoder and forwards the results to a sink.
pub struct BlockEncoderVisitor<'e, S> {
    encoder: &'e mut dyn BlockLayoutEncoder,
    sink: S,
}

impl<'e, S: EncodeVariable> BlockEncoderVisitor<'e, S> {
    pub fn new(encoder: &'e mut dyn BlockLayoutEncoder, sink: S) -> Self {
        BlockEncoderVisitor { encoder, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: EncodeVariable> NamedVariableVisitor for BlockEncoderVisitor<'_, S> {
    fn enter_struct_access(&mut self, _struct_var: &ShaderVariable, _is_row_major: bool) {
        self.encoder.enter_aggregate_type();
    }

    fn exit_struct_access(&mut self, _struct_var: &ShaderVariable, _is_row_major: bool) {
        self.encoder.exit_aggregate_type();
    }

    fn visit_named_variable(
        &mut self,
        variable: &ShaderVariable,
        is_row_major: bool,
        name: &str,
        mapped_name: &str,
    ) {
        // Outer dimensions were already flattened into per-element visits.
        let innermost_array_size: Vec<u32> = if variable.is_array() {
            vec![variable.nested_array_size(0)]
        } else {
            Vec::new()
        };
        let variable_info = self.encoder.encode_type(&variable.ty, &innermost_array_size, is_row_major);
        self.sink.encode_variable(variable, &variable_info, name, mapped_name);
    }
}

/// Name-tracking block encoder visitor, the usual way to lay out a block.
pub fn block_encoder_visitor<'e, S: EncodeVariable>(
    name_prefix: &str,
    mapped_name_prefix: &str,
    encoder: &'e mut dyn BlockLayoutEncoder,
    sink: S,
) -> VariableNameVisitor<BlockEncoderVisitor<'e, S>> {
    VariableNameVisitor::new(name_prefix, mapped_name_prefix, BlockEncoderVisitor::new(encoder, sink))
}

/// Stores each leaf's layout under its plain name.
pub struct BlockLayoutMapSink<'m> {
    info_out: &'m mut BlockLayoutMap,
}

impl<'m> BlockLayoutMapSink<'m> {
    pub fn new(info_out: &'m mut BlockLayoutMap) -> Self {
        BlockLayoutMapSink { info_out }
    }
}

impl EncodeVariable for BlockLayoutMapSink<'_> {
    fn encode_variable(
        &mut self,
        variable: &ShaderVariable,
        variable_info: &BlockMemberInfo,
        name: &str,
        _mapped_name: &str,
    ) {
        assert!(!variable.ty.is_sampler(), "sampler '{}' has no block storage", name);
        assert!(!variable_info.is_default(), "no layout computed for '{}'", name);
        self.info_out.insert(name.to_string(), *variable_info);
    }
}

/// Collects encoded leaves in traversal order.
#[derive(Debug, Default)]
pub struct EncodedMembers {
    pub members: Vec<EncodedMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMember {
    pub name: String,
    pub mapped_name: String,
    pub variable: ShaderVariable,
    pub info: BlockMemberInfo,
}

impl EncodeVariable for EncodedMembers {
    fn encode_variable(
        &mut self,
        variable: &ShaderVariable,
        variable_info: &BlockMemberInfo,
        name: &str,
        mapped_name: &str,
    ) {
        assert!(!variable.ty.is_sampler(), "sampler '{}' has no block storage", name);
        self.members.push(EncodedMember {
            name: name.to_string(),
            mapped_name: mapped_name.to_string(),
            variable: variable.clone(),
            info: *variable_info,
        });
    }
}

/// Lays out `block` one top-level field at a time with `encoder`.
///
/// Leaves inside a top-level array member also get
/// `top_level_array_stride`: the distance between consecutive elements of
/// that member.
pub fn encode_block_members(
    block: &InterfaceBlock,
    name_prefix: &str,
    mapped_name_prefix: &str,
    encoder: &mut dyn BlockLayoutEncoder,
) -> Vec<EncodedMember> {
    let mut encoded = Vec::new();

    for field in &block.fields {
        let start = encoder.current_offset();
        let mut visitor =
            block_encoder_visitor(name_prefix, mapped_name_prefix, &mut *encoder, EncodedMembers::default());
        traverse_shader_variable(field, block.row_major, &mut visitor);
        let mut members = visitor.into_inner().into_sink().members;

        if field.is_array() && !members.is_empty() {
            let consumed = encoder.current_offset() - start;
            let stride = top_level_array_stride(field, &members, consumed);
            for member in &mut members {
                member.info.top_level_array_stride = stride;
            }
        }
        encoded.extend(members);
    }

    encoded
}

fn top_level_array_stride(field: &ShaderVariable, members: &[EncodedMember], consumed_bytes: usize) -> i32 {
    if !field.is_struct() && !field.is_array_of_arrays() {
        // A single arrayed leaf carries its own stride.
        return members[0].info.array_stride;
    }
    let outermost_size = field.outermost_array_size() as usize;
    if outermost_size > 1 {
        let per_element = members.len() / outermost_size;
        members[per_element].info.offset - members[0].info.offset
    } else {
        i32::try_from(consumed_bytes).expect("block offset exceeds i32 range")
    }
}
