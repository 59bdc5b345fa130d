//! Tests for name resolution and the block encoder visitor.

use crate::layout::{BlockLayoutEncoder, DummyEncoder, RegisterEncoder, Std140Encoder};
use crate::names::{EncodedMembers, NamedVariableVisitor, VariableNameVisitor, block_encoder_visitor};
use crate::types::{SamplerKind, VarType};
use crate::variable::ShaderVariable;
use crate::visitor::{ShaderVariableVisitor, traverse_shader_variable, traverse_shader_variables};

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Default)]
struct NameCollector {
    names: Vec<String>,
    mapped_names: Vec<String>,
    samplers: Vec<String>,
}

impl NamedVariableVisitor for NameCollector {
    fn visit_named_sampler(&mut self, _sampler: &ShaderVariable, name: &str, _mapped_name: &str) {
        self.samplers.push(name.to_string());
    }

    fn visit_named_variable(
        &mut self,
        _variable: &ShaderVariable,
        _is_row_major: bool,
        name: &str,
        mapped_name: &str,
    ) {
        self.names.push(name.to_string());
        self.mapped_names.push(mapped_name.to_string());
    }
}

fn collect_names(fields: &[ShaderVariable], prefix: &str) -> NameCollector {
    let mut visitor = VariableNameVisitor::new(prefix, prefix, NameCollector::default());
    traverse_shader_variables(fields, false, &mut visitor);
    visitor.into_inner()
}

fn float(name: &str) -> ShaderVariable {
    ShaderVariable::new(VarType::float(), name)
}

fn encode_members(fields: &[ShaderVariable], encoder: &mut dyn BlockLayoutEncoder) -> EncodedMembers {
    let mut visitor = block_encoder_visitor("", "", encoder, EncodedMembers::default());
    traverse_shader_variables(fields, false, &mut visitor);
    visitor.into_inner().into_sink()
}

// =============================================================================
// Name paths
// =============================================================================

#[test]
fn test_struct_array_member_names() {
    let matrices =
        ShaderVariable::new_struct("matrices", vec![ShaderVariable::new(VarType::mat(3, 3), "m")]).with_array_sizes(&[2]);
    let names = collect_names(&[matrices], "").names;
    assert_eq!(names, vec!["matrices[0].m", "matrices[1].m"]);
}

#[test]
fn test_items_names() {
    let items = ShaderVariable::new_struct("items", vec![ShaderVariable::new(VarType::vec(2), "a")]).with_array_sizes(&[3]);
    let names = collect_names(&[items], "").names;
    assert_eq!(names, vec!["items[0].a", "items[1].a", "items[2].a"]);
}

#[test]
fn test_plain_and_arrayed_leaves() {
    let fields = vec![float("f"), float("g").with_array_sizes(&[4])];
    let names = collect_names(&fields, "").names;
    assert_eq!(names, vec!["f", "g"]);
}

#[test]
fn test_array_of_arrays_names() {
    let a = float("a").with_array_sizes(&[2, 3]);
    assert_eq!(collect_names(&[a], "").names, vec!["a[0]", "a[1]"]);

    let b = float("b").with_array_sizes(&[2, 2, 2]);
    assert_eq!(collect_names(&[b], "").names, vec!["b[0][0]", "b[0][1]", "b[1][0]", "b[1][1]"]);
}

#[test]
fn test_struct_array_of_arrays_names() {
    let s = ShaderVariable::new_struct("s", vec![float("x")]).with_array_sizes(&[2, 2]);
    let names = collect_names(&[s], "").names;
    assert_eq!(names, vec!["s[0][0].x", "s[0][1].x", "s[1][0].x", "s[1][1].x"]);
}

#[test]
fn test_nested_struct_names() {
    let inner = ShaderVariable::new_struct("inner", vec![float("x"), float("y").with_array_sizes(&[2])]);
    let outer = ShaderVariable::new_struct("o", vec![inner, float("f")]);
    let names = collect_names(&[outer], "").names;
    assert_eq!(names, vec!["o.inner.x", "o.inner.y", "o.f"]);
}

#[test]
fn test_array_inside_struct_array() {
    let lights = ShaderVariable::new_struct("lights", vec![float("weights").with_array_sizes(&[2, 4])])
        .with_array_sizes(&[2]);
    let names = collect_names(&[lights], "").names;
    assert_eq!(
        names,
        vec!["lights[0].weights[0]", "lights[0].weights[1]", "lights[1].weights[0]", "lights[1].weights[1]"]
    );
}

#[test]
fn test_prefix_names() {
    let fields = vec![float("a"), ShaderVariable::new_struct("s", vec![float("b")])];
    let collected = collect_names(&fields, "blk");
    assert_eq!(collected.names, vec!["blk.a", "blk.s.b"]);
}

#[test]
fn test_mapped_names() {
    let s = ShaderVariable::new_struct("s", vec![float("x").with_mapped_name("_ux")])
        .with_mapped_name("_us")
        .with_array_sizes(&[2]);
    let mut visitor = VariableNameVisitor::new("blk", "_ublk", NameCollector::default());
    traverse_shader_variable(&s, false, &mut visitor);
    let collected = visitor.into_inner();

    assert_eq!(collected.names, vec!["blk.s[0].x", "blk.s[1].x"]);
    assert_eq!(collected.mapped_names, vec!["_ublk._us[0]._ux", "_ublk._us[1]._ux"]);
}

#[test]
fn test_sampler_names() {
    let s = ShaderVariable::new_struct(
        "mat",
        vec![
            ShaderVariable::new(VarType::Sampler(SamplerKind::Sampler2D), "albedo"),
            float("roughness"),
        ],
    );
    let tex = ShaderVariable::new(VarType::Sampler(SamplerKind::Sampler3D), "volume").with_array_sizes(&[2, 2]);
    let collected = collect_names(&[s, tex], "");

    assert_eq!(collected.samplers, vec!["mat.albedo", "volume[0]", "volume[1]"]);
    assert_eq!(collected.names, vec!["mat.roughness"]);
}

#[test]
#[should_panic(expected = "popped past its prefix")]
fn test_unbalanced_exit_panics() {
    let s = ShaderVariable::new_struct("s", vec![float("x")]);
    let mut visitor = VariableNameVisitor::new("blk", "blk", NameCollector::default());
    visitor.exit_struct(&s);
}

#[test]
#[should_panic(expected = "unbalanced name stack")]
fn test_unfinished_traversal_panics() {
    let s = ShaderVariable::new_struct("s", vec![float("x")]);
    let mut visitor = VariableNameVisitor::new("", "", NameCollector::default());
    visitor.enter_struct(&s);
    visitor.into_inner();
}

// =============================================================================
// Block encoder visitor
// =============================================================================

#[test]
fn test_matrices_layout() {
    let matrices =
        ShaderVariable::new_struct("matrices", vec![ShaderVariable::new(VarType::mat(3, 3), "m")]).with_array_sizes(&[2]);
    let mut encoder = Std140Encoder::new();
    let members = encode_members(&[matrices], &mut encoder).members;

    assert_eq!(members.len(), 2);
    assert_eq!(members[1].name, "matrices[1].m");
    assert_eq!(members[0].info.offset, 0);
    assert_eq!(members[1].info.offset, 48);
    assert_eq!(members[1].info.matrix_stride, 16);
}

#[test]
fn test_encodes_innermost_dimension_only() {
    let a = float("a").with_array_sizes(&[2, 3]);
    let mut encoder = Std140Encoder::new();
    let members = encode_members(&[a], &mut encoder).members;

    assert_eq!(members.len(), 2);
    assert_eq!(members[0].info.array_stride, 16);
    assert_eq!(members[1].info.offset, 48);
    assert_eq!(encoder.current_offset(), 96);
}

#[test]
fn test_samplers_are_not_encoded() {
    let fields = vec![
        ShaderVariable::new(VarType::Sampler(SamplerKind::Sampler2D), "tex"),
        float("f"),
    ];
    let mut encoder = Std140Encoder::new();
    let members = encode_members(&fields, &mut encoder).members;

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "f");
    assert_eq!(members[0].info.offset, 0);
}

#[test]
fn test_dummy_and_real_encoders_visit_same_leaves() {
    let fields = vec![
        float("a"),
        ShaderVariable::new_struct(
            "s",
            vec![
                ShaderVariable::new(VarType::vec(3), "v"),
                ShaderVariable::new_struct("t", vec![float("w").with_array_sizes(&[2, 2])]).with_array_sizes(&[2]),
            ],
        )
        .with_array_sizes(&[3]),
        ShaderVariable::new(VarType::mat(2, 4), "m").with_array_sizes(&[2]),
    ];

    let mut dummy = DummyEncoder::new();
    let mut real = RegisterEncoder::new();
    let dummy_members = encode_members(&fields, &mut dummy).members;
    let real_members = encode_members(&fields, &mut real).members;

    let dummy_names: Vec<&str> = dummy_members.iter().map(|m| m.name.as_str()).collect();
    let real_names: Vec<&str> = real_members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(dummy_names, real_names);
    assert_eq!(dummy_names.len(), 1 + 3 * (1 + 2 * 2) + 1);
    assert!(dummy_members.iter().all(|m| m.info.offset == 0));
}
