//! Leaf type model for block members.
//!
//! A `VarType` is the shape of a single non-aggregate variable as far as
//! layout is concerned: scalars, vectors and float matrices of 4-byte
//! components, plus the opaque sampler types and the `Struct` marker used by
//! aggregate variables. Matrices are described in GLSL terms: `matCxR` has
//! `C` columns of `R` components each.

use crate::error::{CompilerError, Result};
use crate::{bail_input, err_input};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Component type of a scalar, vector or matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    Float,
    Int,
    UInt,
    Bool,
}

impl BasicType {
    fn glsl_vector_prefix(self) -> &'static str {
        match self {
            BasicType::Float => "vec",
            BasicType::Int => "ivec",
            BasicType::UInt => "uvec",
            BasicType::Bool => "bvec",
        }
    }

    fn glsl_scalar_name(self) -> &'static str {
        match self {
            BasicType::Float => "float",
            BasicType::Int => "int",
            BasicType::UInt => "uint",
            BasicType::Bool => "bool",
        }
    }
}

/// Opaque sampler types. They have no block storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DArray,
    Sampler2DShadow,
    ISampler2D,
    USampler2D,
}

impl SamplerKind {
    const ALL: [SamplerKind; 7] = [
        SamplerKind::Sampler2D,
        SamplerKind::Sampler3D,
        SamplerKind::SamplerCube,
        SamplerKind::Sampler2DArray,
        SamplerKind::Sampler2DShadow,
        SamplerKind::ISampler2D,
        SamplerKind::USampler2D,
    ];

    pub fn glsl_name(self) -> &'static str {
        match self {
            SamplerKind::Sampler2D => "sampler2D",
            SamplerKind::Sampler3D => "sampler3D",
            SamplerKind::SamplerCube => "samplerCube",
            SamplerKind::Sampler2DArray => "sampler2DArray",
            SamplerKind::Sampler2DShadow => "sampler2DShadow",
            SamplerKind::ISampler2D => "isampler2D",
            SamplerKind::USampler2D => "usampler2D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VarType {
    Scalar(BasicType),
    /// Vector of 2, 3 or 4 components.
    Vector(BasicType, u8),
    /// Float matrix with `cols` columns of `rows` components, both in 2..=4.
    Matrix {
        cols: u8,
        rows: u8,
    },
    Sampler(SamplerKind),
    Struct,
}

/// Base alignment in components of a scalar or vector with `num_components`
/// components: three-component vectors align like four-component ones.
pub fn component_alignment(num_components: usize) -> usize {
    match num_components {
        1 => 1,
        2 => 2,
        3 | 4 => 4,
        n => panic!("no component alignment for {} components", n),
    }
}

impl VarType {
    pub fn float() -> Self {
        VarType::Scalar(BasicType::Float)
    }

    pub fn vec(size: u8) -> Self {
        VarType::Vector(BasicType::Float, size)
    }

    /// `matCxR`: `cols` columns, `rows` rows.
    pub fn mat(cols: u8, rows: u8) -> Self {
        VarType::Matrix { cols, rows }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, VarType::Matrix { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, VarType::Vector(..))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, VarType::Scalar(_))
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, VarType::Sampler(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, VarType::Struct)
    }

    pub fn basic_type(&self) -> Option<BasicType> {
        match self {
            VarType::Scalar(b) | VarType::Vector(b, _) => Some(*b),
            VarType::Matrix { .. } => Some(BasicType::Float),
            VarType::Sampler(_) | VarType::Struct => None,
        }
    }

    /// Total number of 4-byte components. Zero for opaque and struct types.
    pub fn component_count(&self) -> usize {
        match self {
            VarType::Scalar(_) => 1,
            VarType::Vector(_, n) => *n as usize,
            VarType::Matrix { cols, rows } => (*cols as usize) * (*rows as usize),
            VarType::Sampler(_) | VarType::Struct => 0,
        }
    }

    /// Rows in the GL sense: 1 for scalars and vectors.
    pub fn row_count(&self) -> usize {
        match self {
            VarType::Scalar(_) | VarType::Vector(..) => 1,
            VarType::Matrix { rows, .. } => *rows as usize,
            VarType::Sampler(_) | VarType::Struct => 0,
        }
    }

    /// Columns in the GL sense: the component count for vectors.
    pub fn column_count(&self) -> usize {
        match self {
            VarType::Scalar(_) => 1,
            VarType::Vector(_, n) => *n as usize,
            VarType::Matrix { cols, .. } => *cols as usize,
            VarType::Sampler(_) | VarType::Struct => 0,
        }
    }

    /// Swaps rows and columns of a matrix; other types are returned unchanged.
    pub fn transposed(&self) -> VarType {
        match *self {
            VarType::Matrix { cols, rows } => VarType::Matrix { cols: rows, rows: cols },
            other => other,
        }
    }

    /// Number of 4-component registers a matrix occupies: one per column when
    /// column-major, one per row when row-major.
    pub fn matrix_register_count(&self, is_row_major: bool) -> usize {
        assert!(self.is_matrix(), "register count requested for non-matrix {}", self);
        let register_type = if is_row_major { *self } else { self.transposed() };
        register_type.row_count()
    }

    /// Number of components in each register-sized vector of a matrix.
    pub fn matrix_component_count(&self, is_row_major: bool) -> usize {
        assert!(self.is_matrix(), "component count requested for non-matrix {}", self);
        if is_row_major {
            self.column_count()
        } else {
            self.row_count()
        }
    }

    /// HLSL spelling of the type, `None` for types without one.
    pub fn hlsl_type_string(&self) -> Option<String> {
        let hlsl_basic = |b: BasicType| match b {
            BasicType::Float => "float",
            BasicType::Int => "int",
            BasicType::UInt => "uint",
            BasicType::Bool => "bool",
        };
        match self {
            VarType::Scalar(b) => Some(hlsl_basic(*b).to_string()),
            VarType::Vector(b, n) => Some(format!("{}{}", hlsl_basic(*b), n)),
            VarType::Matrix { cols, rows } => Some(format!("float{}x{}", cols, rows)),
            VarType::Sampler(_) | VarType::Struct => None,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Scalar(b) => write!(f, "{}", b.glsl_scalar_name()),
            VarType::Vector(b, n) => write!(f, "{}{}", b.glsl_vector_prefix(), n),
            VarType::Matrix { cols, rows } if cols == rows => write!(f, "mat{}", cols),
            VarType::Matrix { cols, rows } => write!(f, "mat{}x{}", cols, rows),
            VarType::Sampler(kind) => write!(f, "{}", kind.glsl_name()),
            VarType::Struct => write!(f, "struct"),
        }
    }
}

fn parse_dimension(s: &str, full: &str) -> Result<u8> {
    match s.parse::<u8>() {
        Ok(n @ 2..=4) => Ok(n),
        _ => Err(err_input!("Invalid dimension in type name '{}'", full)),
    }
}

impl FromStr for VarType {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self> {
        for basic in [BasicType::Float, BasicType::Int, BasicType::UInt, BasicType::Bool] {
            if s == basic.glsl_scalar_name() {
                return Ok(VarType::Scalar(basic));
            }
            if let Some(n) = s.strip_prefix(basic.glsl_vector_prefix()) {
                return Ok(VarType::Vector(basic, parse_dimension(n, s)?));
            }
        }
        if let Some(dims) = s.strip_prefix("mat") {
            return match dims.split_once('x') {
                Some((c, r)) => Ok(VarType::mat(parse_dimension(c, s)?, parse_dimension(r, s)?)),
                None => {
                    let n = parse_dimension(dims, s)?;
                    Ok(VarType::mat(n, n))
                }
            };
        }
        if s == "struct" {
            return Ok(VarType::Struct);
        }
        if let Some(kind) = SamplerKind::ALL.iter().find(|k| k.glsl_name() == s) {
            return Ok(VarType::Sampler(*kind));
        }
        bail_input!("Unknown type name '{}'", s)
    }
}

impl TryFrom<String> for VarType {
    type Error = CompilerError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<VarType> for String {
    fn from(ty: VarType) -> String {
        ty.to_string()
    }
}
