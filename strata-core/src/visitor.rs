//! Shader variable visitor pattern
//!
//! The traverse_* functions walk a variable tree depth first: struct fields in
//! declaration order, array elements in ascending index order, outermost
//! array dimension varying slowest. Visitors override only the hooks they
//! need; every hook except `visit_variable` defaults to a no-op.
//!
//! The leaf order is what block encoders rely on, since an encoder is a
//! cursor with no random access.

use crate::variable::ShaderVariable;

/// Hooks called at each structural boundary of a traversal.
pub trait ShaderVariableVisitor {
    /// A struct-typed variable as declared, once even if it is an array.
    fn enter_struct(&mut self, _struct_var: &ShaderVariable) {}

    fn exit_struct(&mut self, _struct_var: &ShaderVariable) {}

    /// One struct instance whose fields are about to be visited.
    fn enter_struct_access(&mut self, _struct_var: &ShaderVariable, _is_row_major: bool) {}

    fn exit_struct_access(&mut self, _struct_var: &ShaderVariable, _is_row_major: bool) {}

    fn enter_array(&mut self, _array_var: &ShaderVariable) {}

    fn exit_array(&mut self, _array_var: &ShaderVariable) {}

    fn enter_array_element(&mut self, _array_var: &ShaderVariable, _array_element: u32) {}

    fn exit_array_element(&mut self, _array_var: &ShaderVariable, _array_element: u32) {}

    fn visit_sampler(&mut self, _sampler: &ShaderVariable) {}

    /// A leaf with at most one array dimension left. `is_row_major` is only
    /// ever true for matrices.
    fn visit_variable(&mut self, variable: &ShaderVariable, is_row_major: bool);
}

// --- Traversal functions ---

/// Traverses each variable in order. No state is reset between variables.
pub fn traverse_shader_variables<V: ShaderVariableVisitor + ?Sized>(
    variables: &[ShaderVariable],
    is_row_major_layout: bool,
    visitor: &mut V,
) {
    for variable in variables {
        traverse_shader_variable(variable, is_row_major_layout, visitor);
    }
}

pub fn traverse_shader_variable<V: ShaderVariableVisitor + ?Sized>(
    variable: &ShaderVariable,
    is_row_major_layout: bool,
    visitor: &mut V,
) {
    let row_major_layout = is_row_major_layout || variable.is_row_major_layout;
    let is_row_major = row_major_layout && variable.ty.is_matrix();

    if variable.is_struct() {
        visitor.enter_struct(variable);
        if variable.is_array() {
            traverse_struct_array_variable(variable, row_major_layout, visitor);
        } else {
            traverse_struct_variable(variable, row_major_layout, visitor);
        }
        visitor.exit_struct(variable);
    } else if variable.is_array_of_arrays() {
        traverse_array_of_arrays_variable(variable, is_row_major, visitor);
    } else if variable.ty.is_sampler() {
        visitor.visit_sampler(variable);
    } else {
        visitor.visit_variable(variable, is_row_major);
    }
}

fn traverse_struct_variable<V: ShaderVariableVisitor + ?Sized>(
    variable: &ShaderVariable,
    is_row_major_layout: bool,
    visitor: &mut V,
) {
    visitor.enter_struct_access(variable, is_row_major_layout);
    traverse_shader_variables(&variable.fields, is_row_major_layout, visitor);
    visitor.exit_struct_access(variable, is_row_major_layout);
}

fn traverse_struct_array_variable<V: ShaderVariableVisitor + ?Sized>(
    variable: &ShaderVariable,
    is_row_major_layout: bool,
    visitor: &mut V,
) {
    visitor.enter_array(variable);

    // Unsized arrays get a single element.
    for array_element in 0..variable.outermost_array_size() {
        visitor.enter_array_element(variable, array_element);

        let mut element = variable.clone();
        element.index_into_array(array_element);
        if element.is_array() {
            traverse_struct_array_variable(&element, is_row_major_layout, visitor);
        } else {
            traverse_struct_variable(&element, is_row_major_layout, visitor);
        }

        visitor.exit_array_element(variable, array_element);
    }

    visitor.exit_array(variable);
}

fn traverse_array_of_arrays_variable<V: ShaderVariableVisitor + ?Sized>(
    variable: &ShaderVariable,
    is_row_major_matrix: bool,
    visitor: &mut V,
) {
    visitor.enter_array(variable);

    for array_element in 0..variable.outermost_array_size() {
        visitor.enter_array_element(variable, array_element);

        let mut element = variable.clone();
        element.index_into_array(array_element);
        if element.is_array_of_arrays() {
            traverse_array_of_arrays_variable(&element, is_row_major_matrix, visitor);
        } else if element.ty.is_sampler() {
            visitor.visit_sampler(&element);
        } else {
            visitor.visit_variable(&element, is_row_major_matrix);
        }

        visitor.exit_array_element(variable, array_element);
    }

    visitor.exit_array(variable);
}
