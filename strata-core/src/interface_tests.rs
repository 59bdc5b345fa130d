//! Tests for block reflection and its JSON/text output.

use crate::error::CompilerError;
use crate::interface::{extract_interface, parse_blocks, reflect_block, to_json, to_text};
use crate::layout::LayoutRule;
use crate::variable::BlockStorage;

const INPUT: &str = r#"{
    "blocks": [
        {
            "name": "Camera",
            "instance_name": "camera",
            "storage": "std140",
            "fields": [
                { "name": "view", "type": "mat4" },
                { "name": "position", "type": "vec3" },
                { "name": "exposure", "type": "float" }
            ]
        },
        {
            "name": "Particles",
            "storage": "packed",
            "fields": [
                { "name": "count", "type": "uint" },
                {
                    "name": "items",
                    "type": "struct",
                    "array_sizes": [2],
                    "fields": [
                        { "name": "pos", "type": "vec2" },
                        { "name": "life", "type": "float" }
                    ]
                }
            ]
        }
    ]
}"#;

#[test]
fn test_parse_blocks() {
    let blocks = parse_blocks(INPUT).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].storage, BlockStorage::Std140);
    assert_eq!(blocks[0].instance_name, "camera");
    assert_eq!(blocks[1].storage, BlockStorage::Packed);
    assert_eq!(blocks[1].fields[1].fields[0].mapped_name, "pos");
}

#[test]
fn test_parse_rejects_invalid_blocks() {
    let empty = r#"{ "blocks": [ { "name": "B", "fields": [] } ] }"#;
    assert!(matches!(parse_blocks(empty), Err(CompilerError::InputError(_))));

    let bad_type = r#"{ "blocks": [ { "name": "B", "fields": [ { "name": "x", "type": "float5" } ] } ] }"#;
    assert!(matches!(parse_blocks(bad_type), Err(CompilerError::Json(_))));

    assert!(matches!(parse_blocks("not json"), Err(CompilerError::Json(_))));
}

#[test]
fn test_reflect_std140_block() {
    let blocks = parse_blocks(INPUT).unwrap();
    let camera = reflect_block(&blocks[0], LayoutRule::Std140);

    assert_eq!(camera.rule, "std140");
    assert_eq!(camera.size, 80);
    let names: Vec<&str> = camera.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["camera.view", "camera.position", "camera.exposure"]);
    assert_eq!(camera.members[0].matrix_stride, 16);
    assert_eq!(camera.members[1].offset, 64);
    assert_eq!(camera.members[2].offset, 76);
    assert_eq!(camera.members[2].register, None);
}

#[test]
fn test_reflect_packed_block_has_registers() {
    let blocks = parse_blocks(INPUT).unwrap();
    let particles = reflect_block(&blocks[1], LayoutRule::Packed);

    let life = particles.members.iter().find(|m| m.name == "items[1].life").unwrap();
    // In components: count 0, items[0] pos 2 life 4, items[1] pos 6 life 8.
    assert_eq!(life.offset, 32);
    assert_eq!(life.register, Some(2));
    assert_eq!(life.register_element, Some(0));
    assert_eq!(particles.size, 36);
}

#[test]
fn test_extract_interface_auto_and_forced_rules() {
    let blocks = parse_blocks(INPUT).unwrap();

    let auto = extract_interface(&blocks, None);
    assert_eq!(auto.blocks[0].rule, "std140");
    assert_eq!(auto.blocks[1].rule, "packed");

    let forced = extract_interface(&blocks, Some(LayoutRule::Std430));
    assert!(forced.blocks.iter().all(|b| b.rule == "std430"));
    assert_eq!(forced.blocks[1].storage, "packed");
}

#[test]
fn test_json_output() {
    let blocks = parse_blocks(INPUT).unwrap();
    let json = to_json(&extract_interface(&blocks, None)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let exposure = &value["blocks"][0]["members"][2];
    assert_eq!(exposure["name"], "camera.exposure");
    assert_eq!(exposure["type"], "float");
    assert_eq!(exposure["offset"], 76);
    assert_eq!(exposure["array_stride"], -1);
    assert!(exposure.get("register").is_none());

    let count = &value["blocks"][1]["members"][0];
    assert_eq!(count["register"], 0);
    assert_eq!(count["register_element"], 0);
}

#[test]
fn test_text_output() {
    let blocks = parse_blocks(INPUT).unwrap();
    let text = to_text(&extract_interface(&blocks, None));

    assert!(text.starts_with("block Camera (std140, rule std140): 80 bytes\n"));
    assert!(text.contains("camera.position"));
    assert!(text.contains("block Particles (packed, rule packed): 36 bytes\n"));
    assert!(text.contains("c2.x"));
}

#[test]
fn test_reflect_reports_top_level_array_stride() {
    let blocks = parse_blocks(INPUT).unwrap();
    let particles = reflect_block(&blocks[1], LayoutRule::Packed);

    let count = &particles.members[0];
    assert_eq!(count.top_level_array_stride, -1);
    // items[0].pos is at component 2 and items[1].pos at component 6.
    for member in &particles.members[1..] {
        assert_eq!(member.top_level_array_stride, 16, "{}", member.name);
    }

    let json = to_json(&extract_interface(&blocks, None)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["blocks"][1]["members"][1]["top_level_array_stride"], 16);
    assert_eq!(value["blocks"][0]["members"][0]["top_level_array_stride"], -1);
}

#[test]
fn test_parse_rejects_oversized_block() {
    let oversized = r#"{ "blocks": [ { "name": "Huge", "fields": [
        { "name": "a", "type": "float", "array_sizes": [200000000] },
        { "name": "b", "type": "float" }
    ] } ] }"#;
    assert!(matches!(parse_blocks(oversized), Err(CompilerError::InputError(_))));

    let overflowing = r#"{ "blocks": [ { "name": "Huge", "fields": [
        { "name": "m", "type": "mat4", "array_sizes": [4294967295, 4294967295, 4294967295] }
    ] } ] }"#;
    assert!(matches!(parse_blocks(overflowing), Err(CompilerError::InputError(_))));

    let large = r#"{ "blocks": [ { "name": "Large", "fields": [
        { "name": "a", "type": "float", "array_sizes": [1000000] }
    ] } ] }"#;
    assert!(parse_blocks(large).is_ok());
}
