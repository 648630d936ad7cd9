//! Program interface reflection.
//!
//! Each stage is compiled separately with naga and its inputs, outputs and
//! resources are read back, which gives name-based lookup of attributes and
//! uniforms. Linking checks that the two stages agree with each other.

use std::collections::HashMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, ScalarKind, Type, TypeInner, VectorSize};

use crate::backend::{UniformKind, UniformLocation};
use crate::error::{ShaderError, ShaderStage};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Bind group holding the uniform block, always at binding 0.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding textures and their samplers.
pub const TEXTURE_GROUP: u32 = 1;

/// A vertex stage input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    pub location: u32,
    pub components: u32,
}

/// What a linked program reads and how it is laid out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramInterface {
    attributes: HashMap<String, AttributeInfo>,
    uniforms: HashMap<String, UniformLocation>,
    uniform_size: u32,
    textures: u32,
}

impl ProgramInterface {
    /// Compile both stages and link them.
    pub fn link(label: &str, vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vs = compile(label, ShaderStage::Vertex, vertex)?;
        let fs = compile(label, ShaderStage::Fragment, fragment)?;

        let vs_entry = entry_point(label, &vs, ShaderStage::Vertex)?;
        let fs_entry = entry_point(label, &fs, ShaderStage::Fragment)?;

        let mut outputs = Vec::new();
        if let Some(result) = &vs_entry.function.result {
            collect_locations(&vs, result.ty, result.binding.as_ref(), None, &mut outputs);
        }
        let mut varyings = Vec::new();
        for arg in &fs_entry.function.arguments {
            collect_locations(&fs, arg.ty, arg.binding.as_ref(), arg.name.as_deref(), &mut varyings);
        }
        for input in &varyings {
            if !outputs.iter().any(|output| output.location == input.location) {
                return Err(ShaderError::Link {
                    label: label.to_string(),
                    message: format!(
                        "fragment input @location({}) is not written by the vertex stage",
                        input.location
                    ),
                });
            }
        }

        let mut inputs = Vec::new();
        for arg in &vs_entry.function.arguments {
            collect_locations(&vs, arg.ty, arg.binding.as_ref(), arg.name.as_deref(), &mut inputs);
        }
        let attributes = inputs
            .into_iter()
            .filter_map(|slot| {
                let name = slot.name?;
                let components = components(&vs.types[slot.ty].inner)?;
                Some((
                    name,
                    AttributeInfo {
                        location: slot.location,
                        components,
                    },
                ))
            })
            .collect();

        let mut interface = Self {
            attributes,
            ..Self::default()
        };
        interface.merge_resources(label, ShaderStage::Vertex, &vs)?;
        interface.merge_resources(label, ShaderStage::Fragment, &fs)?;
        Ok(interface)
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeInfo> {
        self.attributes.get(name).copied()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, AttributeInfo)> {
        self.attributes.iter().map(|(name, info)| (name.as_str(), *info))
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Size of the uniform block in bytes, padded to 16.
    pub fn uniform_size(&self) -> u32 {
        self.uniform_size
    }

    /// Whether the program samples a texture.
    pub fn has_texture(&self) -> bool {
        self.textures > 0
    }

    fn merge_resources(
        &mut self,
        label: &str,
        stage: ShaderStage,
        module: &Module,
    ) -> Result<(), ShaderError> {
        let compile_error = |message: String| ShaderError::Compile {
            label: label.to_string(),
            stage,
            message,
        };

        for (_, var) in module.global_variables.iter() {
            let group = var.binding.as_ref().map(|b| (b.group, b.binding));
            match var.space {
                AddressSpace::Uniform => {
                    if group != Some((UNIFORM_GROUP, 0)) {
                        return Err(compile_error(format!(
                            "uniform block must be bound at @group({UNIFORM_GROUP}) @binding(0)"
                        )));
                    }
                    let (members, span) = uniform_members(module, var.ty, var.name.as_deref());
                    self.uniform_size = self.uniform_size.max(align16(span));
                    for (name, location) in members {
                        self.insert_uniform(label, name, location)?;
                    }
                }
                AddressSpace::Handle => {
                    if !matches!(module.types[var.ty].inner, TypeInner::Image { .. }) {
                        continue;
                    }
                    let Some((TEXTURE_GROUP, binding)) = group else {
                        return Err(compile_error(format!(
                            "textures must be bound in @group({TEXTURE_GROUP})"
                        )));
                    };
                    if let Some(name) = &var.name {
                        self.insert_uniform(label, name.clone(), UniformLocation::Texture { binding })?;
                    }
                    self.textures += 1;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn insert_uniform(
        &mut self,
        label: &str,
        name: String,
        location: UniformLocation,
    ) -> Result<(), ShaderError> {
        match self.uniforms.get(&name) {
            Some(existing) if *existing != location => Err(ShaderError::Link {
                label: label.to_string(),
                message: format!("uniform `{name}` is declared differently in each stage"),
            }),
            _ => {
                self.uniforms.insert(name, location);
                Ok(())
            }
        }
    }
}

fn compile(label: &str, stage: ShaderStage, source: &str) -> Result<Module, ShaderError> {
    let error = |message: String| ShaderError::Compile {
        label: label.to_string(),
        stage,
        message,
    };
    let module = naga::front::wgsl::parse_str(source).map_err(|e| error(e.emit_to_string(source)))?;
    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| error(e.into_inner().to_string()))?;
    Ok(module)
}

fn entry_point<'m>(
    label: &str,
    module: &'m Module,
    stage: ShaderStage,
) -> Result<&'m naga::EntryPoint, ShaderError> {
    let (name, naga_stage) = match stage {
        ShaderStage::Vertex => (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        ShaderStage::Fragment => (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    };
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == naga_stage)
        .ok_or_else(|| ShaderError::Compile {
            label: label.to_string(),
            stage,
            message: format!("missing entry point `{name}`"),
        })
}

struct LocationSlot {
    name: Option<String>,
    location: u32,
    ty: Handle<Type>,
}

/// Flatten a bound argument or result into its `@location` slots.
fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    name: Option<&str>,
    out: &mut Vec<LocationSlot>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(LocationSlot {
            name: name.map(str::to_string),
            location: *location,
            ty,
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_deref(),
                        out,
                    );
                }
            }
        }
    }
}

fn uniform_members(
    module: &Module,
    ty: Handle<Type>,
    var_name: Option<&str>,
) -> (Vec<(String, UniformLocation)>, u32) {
    match &module.types[ty].inner {
        TypeInner::Struct { members, span } => {
            let located = members
                .iter()
                .filter_map(|member| {
                    let name = member.name.clone()?;
                    let kind = uniform_kind(&module.types[member.ty].inner)?;
                    Some((
                        name,
                        UniformLocation::Block {
                            offset: member.offset,
                            kind,
                        },
                    ))
                })
                .collect();
            (located, *span)
        }
        inner => match (var_name, uniform_kind(inner)) {
            (Some(name), Some(kind)) => (
                vec![(name.to_string(), UniformLocation::Block { offset: 0, kind })],
                kind.size(),
            ),
            _ => (Vec::new(), 0),
        },
    }
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float => Some(UniformKind::Mat4),
        TypeInner::Vector {
            size: VectorSize::Tri,
            scalar,
        } if scalar.kind == ScalarKind::Float => Some(UniformKind::Vec3),
        TypeInner::Vector {
            size: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float => Some(UniformKind::Vec4),
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float => Some(UniformKind::Float),
            ScalarKind::Sint | ScalarKind::Uint => Some(UniformKind::Int),
            _ => None,
        },
        _ => None,
    }
}

fn components(inner: &TypeInner) -> Option<u32> {
    match *inner {
        TypeInner::Scalar(_) => Some(1),
        TypeInner::Vector { size, .. } => Some(match size {
            VectorSize::Bi => 2,
            VectorSize::Tri => 3,
            VectorSize::Quad => 4,
        }),
        _ => None,
    }
}

fn align16(size: u32) -> u32 {
    (size + 15) & !15
}
