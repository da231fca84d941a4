//! Uniform table for the background shader.
//!
//! The table is reflected from the fragment shader's `var<uniform>` struct
//! when the shader is compiled. Every frame the values are written into a
//! staging buffer at the cached offsets; the struct is never re-inspected.

use glam::Vec2;
use naga::{ArraySize, Module, Scalar, ScalarKind, TypeInner, VectorSize};

use crate::shader::ShaderError;

/// Values the background shader can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformField {
    /// Surface size in pixels.
    Resolution,
    /// Seconds since the renderer started.
    Time,
    /// Accumulated pointer movement.
    Movement,
    /// First pointer in canvas coordinates.
    Touch,
    /// Number of active pointers.
    PointerCount,
    /// Flattened pointer coordinates, two floats per pointer.
    Pointers,
}

impl UniformField {
    pub const ALL: [UniformField; 6] = [
        UniformField::Resolution,
        UniformField::Time,
        UniformField::Movement,
        UniformField::Touch,
        UniformField::PointerCount,
        UniformField::Pointers,
    ];

    /// Member name in the WGSL uniform struct.
    pub fn member_name(self) -> &'static str {
        match self {
            UniformField::Resolution => "resolution",
            UniformField::Time => "time",
            UniformField::Movement => "movement",
            UniformField::Touch => "touch",
            UniformField::PointerCount => "pointer_count",
            UniformField::Pointers => "pointers",
        }
    }

    fn from_member_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.member_name() == name)
    }

    fn expected_type(self) -> &'static str {
        match self {
            UniformField::Resolution | UniformField::Movement | UniformField::Touch => "vec2<f32>",
            UniformField::Time => "f32",
            UniformField::PointerCount => "i32, u32 or f32",
            UniformField::Pointers => "array<vec4<f32>, N>",
        }
    }

    fn accepts(self, kind: UniformKind) -> bool {
        match self {
            UniformField::Resolution | UniformField::Movement | UniformField::Touch => {
                kind == UniformKind::Vec2
            }
            UniformField::Time => kind == UniformKind::Float,
            UniformField::PointerCount => matches!(
                kind,
                UniformKind::Int | UniformKind::UInt | UniformKind::Float
            ),
            UniformField::Pointers => matches!(kind, UniformKind::FloatArray { .. }),
        }
    }
}

/// Storage type of a reflected struct member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Int,
    UInt,
    /// `array<vec4<f32>, N>`, holding `floats` tightly packed values.
    FloatArray { floats: u32 },
}

impl UniformKind {
    fn reflect(module: &Module, inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(Scalar::F32) => Some(UniformKind::Float),
            TypeInner::Scalar(Scalar {
                kind: ScalarKind::Sint,
                width: 4,
            }) => Some(UniformKind::Int),
            TypeInner::Scalar(Scalar {
                kind: ScalarKind::Uint,
                width: 4,
            }) => Some(UniformKind::UInt),
            TypeInner::Vector {
                size: VectorSize::Bi,
                scalar: Scalar::F32,
            } => Some(UniformKind::Vec2),
            TypeInner::Array {
                base,
                size: ArraySize::Constant(len),
                stride: 16,
            } => match module.types[base].inner {
                TypeInner::Vector {
                    size: VectorSize::Quad,
                    scalar: Scalar::F32,
                } => Some(UniformKind::FloatArray {
                    floats: len.get() * 4,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One resolved uniform: where it lives in the buffer and how it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub field: UniformField,
    pub offset: u32,
    pub kind: UniformKind,
}

/// Per-frame values written into the uniform buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformFrame<'a> {
    pub resolution: Vec2,
    pub time: f32,
    pub movement: Vec2,
    pub touch: Vec2,
    pub pointer_count: u32,
    pub pointers: &'a [f32],
}

/// Name to offset table of the uniform struct, resolved once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformTable {
    size: u32,
    slots: Vec<UniformSlot>,
}

impl UniformTable {
    /// Reflect the uniform struct bound at `@group(0) @binding(0)`.
    ///
    /// Returns an empty table when the shader declares no uniforms. Members
    /// with unrecognised names are skipped.
    pub fn reflect(module: &Module) -> Result<Self, ShaderError> {
        let mut table = UniformTable::default();

        for (_, global) in module.global_variables.iter() {
            match global.space {
                naga::AddressSpace::Uniform => {}
                naga::AddressSpace::Handle | naga::AddressSpace::Storage { .. } => {
                    return Err(ShaderError::UnsupportedBinding {
                        name: global.name.clone().unwrap_or_default(),
                    });
                }
                _ => continue,
            }
            let at_origin = global
                .binding
                .as_ref()
                .is_some_and(|binding| binding.group == 0 && binding.binding == 0);
            if !at_origin || table.size > 0 {
                return Err(ShaderError::UnsupportedBinding {
                    name: global.name.clone().unwrap_or_default(),
                });
            }

            let TypeInner::Struct { ref members, span } = module.types[global.ty].inner else {
                return Err(ShaderError::UnsupportedBinding {
                    name: global.name.clone().unwrap_or_default(),
                });
            };
            table.size = span;

            for member in members {
                let Some(name) = member.name.as_deref() else {
                    continue;
                };
                let Some(field) = UniformField::from_member_name(name) else {
                    log::debug!("Ignoring unknown uniform member '{name}'");
                    continue;
                };
                let kind = UniformKind::reflect(module, &module.types[member.ty].inner)
                    .filter(|&kind| field.accepts(kind))
                    .ok_or(ShaderError::UniformType {
                        member: field.member_name(),
                        expected: field.expected_type(),
                    })?;
                table.slots.push(UniformSlot {
                    field,
                    offset: member.offset,
                    kind,
                });
            }
        }

        Ok(table)
    }

    /// Byte size of the uniform struct; zero when there is none.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[must_use]
    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, field: UniformField) -> Option<&UniformSlot> {
        self.slots.iter().find(|slot| slot.field == field)
    }

    /// Write `frame` into `staging` at the cached offsets.
    ///
    /// `staging` is resized to the struct size if needed. Pointer arrays are
    /// truncated to their declared capacity and zero-filled past the data.
    pub fn write(&self, staging: &mut Vec<u8>, frame: &UniformFrame<'_>) {
        staging.resize(self.size as usize, 0);

        for slot in &self.slots {
            let start = slot.offset as usize;
            match (slot.field, slot.kind) {
                (UniformField::Resolution, _) => put(staging, start, &frame.resolution.to_array()),
                (UniformField::Movement, _) => put(staging, start, &frame.movement.to_array()),
                (UniformField::Touch, _) => put(staging, start, &frame.touch.to_array()),
                (UniformField::Time, _) => put(staging, start, &[frame.time]),
                (UniformField::PointerCount, UniformKind::Int) => {
                    let count = i32::try_from(frame.pointer_count).unwrap_or(i32::MAX);
                    put(staging, start, &[count]);
                }
                (UniformField::PointerCount, UniformKind::Float) => {
                    put(staging, start, &[frame.pointer_count as f32]);
                }
                (UniformField::PointerCount, _) => put(staging, start, &[frame.pointer_count]),
                (UniformField::Pointers, UniformKind::FloatArray { floats }) => {
                    let capacity = floats as usize;
                    let used = frame.pointers.len().min(capacity);
                    put(staging, start, &frame.pointers[..used]);
                    let tail = start + used * 4..start + capacity * 4;
                    staging[tail].fill(0);
                }
                (UniformField::Pointers, _) => {}
            }
        }
    }
}

fn put<T: bytemuck::Pod>(staging: &mut [u8], start: usize, values: &[T]) {
    let bytes: &[u8] = bytemuck::cast_slice(values);
    staging[start..start + bytes.len()].copy_from_slice(bytes);
}
