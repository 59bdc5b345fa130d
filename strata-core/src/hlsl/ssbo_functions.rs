//! Load/store wrapper functions for `RWByteAddressBuffer`.
//!
//! Each distinct access shape (type, method, matrix packing, swizzle) needs one
//! wrapper function. Shapes are registered while code is generated and the
//! wrappers are emitted together in the shader header. The registry is a
//! `BTreeSet` ordered on (function name, type string, method) so the header
//! is identical regardless of the order in which shapes were discovered.

use super::get_matrix_stride;
use crate::error::Result;
use crate::layout::BYTES_PER_COMPONENT;
use crate::types::{BasicType, VarType};
use crate::variable::BlockFieldType;
use crate::{bail_hlsl, bail_unsupported};
use log::debug;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SsboMethod {
    Load,
    Store,
}

impl SsboMethod {
    fn suffix(self) -> &'static str {
        match self {
            SsboMethod::Load => "Load",
            SsboMethod::Store => "Store",
        }
    }
}

/// One registered wrapper shape.
#[derive(Debug, Clone)]
pub struct ShaderStorageBlockFunction {
    pub function_name: String,
    pub type_string: String,
    pub method: SsboMethod,
    pub ty: VarType,
    pub row_major: bool,
    /// In bytes.
    pub matrix_stride: i32,
    /// Component indices accessed, in access order.
    pub swizzle_offsets: Vec<u32>,
    pub is_default_swizzle: bool,
}

impl ShaderStorageBlockFunction {
    fn key(&self) -> (&str, &str, SsboMethod) {
        (&self.function_name, &self.type_string, self.method)
    }
}

impl PartialEq for ShaderStorageBlockFunction {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ShaderStorageBlockFunction {}

impl PartialOrd for ShaderStorageBlockFunction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShaderStorageBlockFunction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

fn swizzle_letter(offset: u32) -> char {
    match offset {
        0 => 'x',
        1 => 'y',
        2 => 'z',
        3 => 'w',
        _ => unreachable!("swizzle offsets are validated on registration"),
    }
}

/// Registered wrapper shapes, in emission order.
#[derive(Debug, Default)]
pub struct ShaderStorageBlockFunctions {
    registered: BTreeSet<ShaderStorageBlockFunction>,
}

impl ShaderStorageBlockFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderStorageBlockFunction> {
        self.registered.iter()
    }

    /// Registers the wrapper for a whole-field access and returns its name.
    /// The matrix stride is computed from the field's own layout.
    pub fn register_field_access(&mut self, field: &BlockFieldType, method: SsboMethod) -> Result<String> {
        if field.ty.hlsl_type_string().is_none() {
            bail_unsupported!("no {} wrapper for type {}", method.suffix(), field.ty);
        }
        let matrix_stride = get_matrix_stride(field);
        self.register_function(&field.ty, method, field.row_major, matrix_stride, None)
    }

    /// Registers a wrapper and returns the name callers should emit.
    ///
    /// The name is `{TypeName}_{Load|Store}`, suffixed with `_rm` for
    /// row-major access and with the swizzle letters for a non-default
    /// swizzle. `swizzle` is only valid for vectors. Row-major packing is
    /// ignored for scalars.
    pub fn register_function(
        &mut self,
        ty: &VarType,
        method: SsboMethod,
        row_major: bool,
        matrix_stride: i32,
        swizzle: Option<&[u32]>,
    ) -> Result<String> {
        let Some(base_type_string) = ty.hlsl_type_string() else {
            bail_unsupported!("no {} wrapper for type {}", method.suffix(), ty);
        };

        let row_major = row_major && (ty.is_matrix() || ty.is_vector());

        let (swizzle_offsets, is_default_swizzle) = match swizzle {
            Some(offsets) => {
                if !ty.is_vector() {
                    bail_hlsl!("swizzled access on non-vector type {}", ty);
                }
                let out_of_range = offsets.iter().any(|o| *o as usize >= ty.column_count());
                if offsets.is_empty() || offsets.len() > 4 || out_of_range {
                    bail_hlsl!("invalid swizzle {:?} for type {}", offsets, ty);
                }
                (offsets.to_vec(), false)
            }
            None if ty.is_vector() => ((0..ty.column_count() as u32).collect(), true),
            None => (vec![0], true),
        };

        if (row_major || ty.is_matrix()) && matrix_stride <= 0 {
            bail_hlsl!("{} access on {} needs a matrix stride, got {}", method.suffix(), ty, matrix_stride);
        }

        // A swizzled access loads or stores only the selected components.
        let type_string = match (is_default_swizzle, ty.basic_type()) {
            (false, Some(basic)) if swizzle_offsets.len() == 1 => VarType::Scalar(basic).to_string(),
            (false, Some(basic)) => format!("{}{}", VarType::Scalar(basic), swizzle_offsets.len()),
            _ => base_type_string.clone(),
        };

        let mut function_name = format!("{}_{}", base_type_string, method.suffix());
        if row_major {
            function_name.push_str("_rm");
        }
        if !is_default_swizzle {
            function_name.push('_');
            function_name.extend(swizzle_offsets.iter().map(|o| swizzle_letter(*o)));
        }

        let function = ShaderStorageBlockFunction {
            function_name,
            type_string,
            method,
            ty: *ty,
            row_major,
            matrix_stride,
            swizzle_offsets,
            is_default_swizzle,
        };

        if let Some(existing) = self.registered.get(&function) {
            if existing.matrix_stride != function.matrix_stride {
                bail_hlsl!(
                    "{} registered with matrix stride {} and {}",
                    function.function_name,
                    existing.matrix_stride,
                    function.matrix_stride
                );
            }
            return Ok(existing.function_name.clone());
        }

        let name = function.function_name.clone();
        self.registered.insert(function);
        Ok(name)
    }

    /// Writes every registered wrapper, in order.
    pub fn write_header(&self, out: &mut String) -> Result<()> {
        for function in &self.registered {
            match function.method {
                SsboMethod::Load => {
                    writeln!(
                        out,
                        "{} {}(RWByteAddressBuffer buffer, uint loc)",
                        function.type_string, function.function_name
                    )
                    .unwrap();
                    out.push_str("{\n");
                    write_load_function_body(out, function)?;
                }
                SsboMethod::Store => {
                    writeln!(
                        out,
                        "void {}(RWByteAddressBuffer buffer, uint loc, {} value)",
                        function.function_name, function.type_string
                    )
                    .unwrap();
                    out.push_str("{\n");
                    write_store_function_body(out, function)?;
                }
            }
            out.push_str("}\n\n");
        }
        debug!("wrote {} ssbo wrapper functions", self.registered.len());
        Ok(())
    }

    pub fn header(&self) -> Result<String> {
        let mut out = String::new();
        self.write_header(&mut out)?;
        Ok(out)
    }
}

fn convert_function(ty: &VarType) -> Result<&'static str> {
    match ty.basic_type() {
        Some(BasicType::Float) => Ok("asfloat"),
        Some(BasicType::Int) => Ok("asint"),
        Some(BasicType::UInt) => Ok("asuint"),
        // Stored as 0/1; nonzero converts to true.
        Some(BasicType::Bool) => Ok("asint"),
        None => bail_unsupported!("no load conversion for {}", ty),
    }
}

/// Byte distance between consecutive accessed components.
fn component_stride(function: &ShaderStorageBlockFunction) -> usize {
    if function.row_major {
        function.matrix_stride as usize
    } else {
        BYTES_PER_COMPONENT
    }
}

fn write_load_function_body(out: &mut String, function: &ShaderStorageBlockFunction) -> Result<()> {
    let convert = convert_function(&function.ty)?;
    let ty = &function.ty;
    let matrix_stride = function.matrix_stride as usize;

    match ty {
        VarType::Scalar(_) => {
            let offset = function.swizzle_offsets[0] as usize * BYTES_PER_COMPONENT;
            writeln!(
                out,
                "    {} result = {}(buffer.Load(loc + {}));",
                function.type_string, convert, offset
            )
            .unwrap();
        }
        VarType::Vector(_, size) => {
            let stride = component_stride(function);
            let loads: Vec<String> = function
                .swizzle_offsets
                .iter()
                .map(|o| format!("{}(buffer.Load(loc + {}))", convert, *o as usize * stride))
                .collect();
            if loads.len() == 1 {
                writeln!(out, "    {} result = {};", function.type_string, loads[0]).unwrap();
            } else if function.row_major || !function.is_default_swizzle {
                writeln!(out, "    {} result = {{{}}};", function.type_string, loads.join(", ")).unwrap();
            } else {
                writeln!(
                    out,
                    "    {} result = {}(buffer.Load{}(loc));",
                    function.type_string, convert, size
                )
                .unwrap();
            }
        }
        VarType::Matrix { cols, rows } => {
            if function.row_major {
                let loads: Vec<String> = (0..*rows as usize)
                    .map(|row| format!("asfloat(buffer.Load{}(loc + {}))", cols, row * matrix_stride))
                    .collect();
                writeln!(out, "    {} result;", function.type_string).unwrap();
                writeln!(out, "    float{}x{} tmp_ = {{{}}};", rows, cols, loads.join(", ")).unwrap();
                out.push_str("    result = transpose(tmp_);\n");
            } else {
                let loads: Vec<String> = (0..*cols as usize)
                    .map(|column| format!("asfloat(buffer.Load{}(loc + {}))", rows, column * matrix_stride))
                    .collect();
                writeln!(out, "    {} result = {{{}}};", function.type_string, loads.join(", ")).unwrap();
            }
        }
        VarType::Sampler(_) | VarType::Struct => {
            bail_unsupported!("no load body for {}", ty);
        }
    }

    out.push_str("    return result;\n");
    Ok(())
}

fn write_store_function_body(out: &mut String, function: &ShaderStorageBlockFunction) -> Result<()> {
    let ty = &function.ty;
    let is_bool = ty.basic_type() == Some(BasicType::Bool);
    let matrix_stride = function.matrix_stride as usize;

    match ty {
        VarType::Scalar(_) => {
            let offset = function.swizzle_offsets[0] as usize * BYTES_PER_COMPONENT;
            let value = if is_bool { "uint(value)" } else { "asuint(value)" };
            writeln!(out, "    buffer.Store(loc + {}, {});", offset, value).unwrap();
        }
        VarType::Vector(_, size) => {
            let stride = component_stride(function);
            let count = function.swizzle_offsets.len();
            if count == 1 {
                let value = if is_bool { "uint(value)" } else { "asuint(value)" };
                let offset = function.swizzle_offsets[0] as usize * stride;
                writeln!(out, "    buffer.Store(loc + {}, {});", offset, value).unwrap();
                return Ok(());
            }

            writeln!(out, "    uint{} _value;", count).unwrap();
            if is_bool {
                writeln!(out, "    _value = uint{}(value);", count).unwrap();
            } else {
                out.push_str("    _value = asuint(value);\n");
            }

            if function.row_major || !function.is_default_swizzle {
                for (index, offset) in function.swizzle_offsets.iter().enumerate() {
                    writeln!(
                        out,
                        "    buffer.Store(loc + {}, _value[{}]);",
                        *offset as usize * stride,
                        index
                    )
                    .unwrap();
                }
            } else {
                writeln!(out, "    buffer.Store{}(loc, _value);", size).unwrap();
            }
        }
        VarType::Matrix { cols, rows } => {
            if function.row_major {
                writeln!(out, "    float{}x{} tmp_ = transpose(value);", rows, cols).unwrap();
                for row in 0..*rows as usize {
                    writeln!(
                        out,
                        "    buffer.Store{}(loc + {}, asuint(tmp_[{}]));",
                        cols,
                        row * matrix_stride,
                        row
                    )
                    .unwrap();
                }
            } else {
                for column in 0..*cols as usize {
                    writeln!(
                        out,
                        "    buffer.Store{}(loc + {}, asuint(value[{}]));",
                        rows,
                        column * matrix_stride,
                        column
                    )
                    .unwrap();
                }
            }
        }
        VarType::Sampler(_) | VarType::Struct => {
            bail_unsupported!("no store body for {}", ty);
        }
    }

    Ok(())
}
