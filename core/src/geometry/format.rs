//! Vertex formats.
//!
//! Formats use the WebGPU naming scheme (`float32x2`, `sint32x2`, `unorm8x4`).
//! The component-type part of the name decides how the attribute reaches the
//! shader: `uint*`/`sint*` formats are integer attributes and must be bound
//! with the integer pointer call, everything else is read as float (with
//! `unorm*`/`snorm*` normalized).

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Scalar type of a single vertex component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
}

impl ScalarType {
    /// Size in bytes.
    pub fn size(&self) -> u32 {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 | Self::F16 => 2,
            Self::F32 | Self::U32 | Self::I32 => 4,
        }
    }
}

macro_rules! vertex_formats {
    ($($variant:ident => ($name:literal, $scalar:ident, $components:literal, $normalized:literal)),* $(,)?) => {
        /// Format of a vertex attribute.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum VertexFormat {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl VertexFormat {
            /// Every supported format.
            pub const ALL: &'static [VertexFormat] = &[$(Self::$variant),*];

            /// WebGPU-style name of the format.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Scalar type of each component.
            pub fn scalar(&self) -> ScalarType {
                match self {
                    $(Self::$variant => ScalarType::$scalar,)*
                }
            }

            /// Number of components (1 to 4).
            pub fn components(&self) -> u32 {
                match self {
                    $(Self::$variant => $components,)*
                }
            }

            /// Whether integer components are normalized to `[0, 1]` / `[-1, 1]`.
            pub fn is_normalized(&self) -> bool {
                match self {
                    $(Self::$variant => $normalized,)*
                }
            }
        }
    };
}

vertex_formats! {
    Uint8x2 => ("uint8x2", U8, 2, false),
    Uint8x4 => ("uint8x4", U8, 4, false),
    Sint8x2 => ("sint8x2", I8, 2, false),
    Sint8x4 => ("sint8x4", I8, 4, false),
    Unorm8x2 => ("unorm8x2", U8, 2, true),
    Unorm8x4 => ("unorm8x4", U8, 4, true),
    Snorm8x2 => ("snorm8x2", I8, 2, true),
    Snorm8x4 => ("snorm8x4", I8, 4, true),
    Uint16x2 => ("uint16x2", U16, 2, false),
    Uint16x4 => ("uint16x4", U16, 4, false),
    Sint16x2 => ("sint16x2", I16, 2, false),
    Sint16x4 => ("sint16x4", I16, 4, false),
    Unorm16x2 => ("unorm16x2", U16, 2, true),
    Unorm16x4 => ("unorm16x4", U16, 4, true),
    Snorm16x2 => ("snorm16x2", I16, 2, true),
    Snorm16x4 => ("snorm16x4", I16, 4, true),
    Float16x2 => ("float16x2", F16, 2, false),
    Float16x4 => ("float16x4", F16, 4, false),
    Float32 => ("float32", F32, 1, false),
    Float32x2 => ("float32x2", F32, 2, false),
    Float32x3 => ("float32x3", F32, 3, false),
    Float32x4 => ("float32x4", F32, 4, false),
    Uint32 => ("uint32", U32, 1, false),
    Uint32x2 => ("uint32x2", U32, 2, false),
    Uint32x3 => ("uint32x3", U32, 3, false),
    Uint32x4 => ("uint32x4", U32, 4, false),
    Sint32 => ("sint32", I32, 1, false),
    Sint32x2 => ("sint32x2", I32, 2, false),
    Sint32x3 => ("sint32x3", I32, 3, false),
    Sint32x4 => ("sint32x4", I32, 4, false),
}

impl VertexFormat {
    /// Size in bytes of one attribute value.
    pub fn size(&self) -> u32 {
        self.scalar().size() * self.components()
    }

    /// Whether the attribute is an integer attribute in the shader.
    ///
    /// Decided by the component-type part of the name: `uint*` and `sint*`.
    pub fn is_integer(&self) -> bool {
        let name = self.name();
        name.starts_with("uint") || name.starts_with("sint")
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VertexFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.name() == s)
            .ok_or_else(|| CoreError::UnknownVertexFormat(s.to_string()))
    }
}
