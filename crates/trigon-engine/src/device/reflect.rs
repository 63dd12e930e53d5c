//! WGSL compilation and program linking on top of `naga`.
//!
//! Compiling a stage parses and validates the source, then records the stage
//! interface (vertex inputs, inter-stage varyings, uniforms) so a program can
//! be linked and queried by name without touching the GPU.

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, Type, TypeInner};

use super::api::ShaderStage;

/// Largest bind group index the default device limits accept.
const MAX_BIND_GROUP: u32 = 3;

/// A located stage input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Varying {
    pub name: Option<String>,
    pub location: u32,
    pub components: u32,
}

/// A uniform buffer binding read by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformDecl {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub size: u64,
}

/// Interface of one compiled stage.
#[derive(Debug, Clone)]
pub(crate) struct StageReflection {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub inputs: Vec<Varying>,
    pub outputs: Vec<Varying>,
    pub uniforms: Vec<UniformDecl>,
}

/// Interface of a linked program.
#[derive(Debug, Clone)]
pub(crate) struct ProgramLayout {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub inputs: Vec<Varying>,
    pub uniforms: Vec<UniformDecl>,
}

impl ProgramLayout {
    pub fn input(&self, name: &str) -> Option<&Varying> {
        self.inputs.iter().find(|v| v.name.as_deref() == Some(name))
    }

    pub fn uniform_index(&self, name: &str) -> Option<usize> {
        self.uniforms.iter().position(|u| u.name == name)
    }

    /// Highest bind group index in use, if any uniform is declared.
    pub fn max_group(&self) -> Option<u32> {
        self.uniforms.iter().map(|u| u.group).max()
    }
}

/// Parses, validates and reflects one stage.
///
/// Errors are rendered diagnostics suitable for logging.
pub(crate) fn compile_stage(stage: ShaderStage, source: &str) -> Result<StageReflection, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let Some(index) = module.entry_points.iter().position(|ep| ep.stage == wanted) else {
        return Err(format!("source declares no {stage} entry point"));
    };
    let ep = &module.entry_points[index];

    let mut inputs = Vec::new();
    for arg in &ep.function.arguments {
        collect_located(&module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_located(&module, None, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let uniforms = collect_uniforms(&module, &info, index)?;

    Ok(StageReflection {
        stage,
        entry_point: ep.name.clone(),
        inputs,
        outputs,
        uniforms,
    })
}

/// Checks that `vertex` feeds `fragment` and merges their uniform tables.
pub(crate) fn link(
    vertex: &StageReflection,
    fragment: &StageReflection,
) -> Result<ProgramLayout, String> {
    if vertex.stage != ShaderStage::Vertex {
        return Err(format!("expected a vertex stage, got {}", vertex.stage));
    }
    if fragment.stage != ShaderStage::Fragment {
        return Err(format!("expected a fragment stage, got {}", fragment.stage));
    }

    for input in &fragment.inputs {
        match vertex.outputs.iter().find(|o| o.location == input.location) {
            None => {
                return Err(format!(
                    "fragment input at location {} is not written by the vertex stage",
                    input.location
                ));
            }
            Some(out) if out.components != input.components => {
                return Err(format!(
                    "location {} is written with {} components but read with {}",
                    input.location, out.components, input.components
                ));
            }
            Some(_) => {}
        }
    }

    if !fragment.outputs.iter().any(|o| o.location == 0) {
        return Err("fragment stage writes no color output at location 0".to_string());
    }

    let mut uniforms: Vec<UniformDecl> = vertex.uniforms.clone();
    for decl in &fragment.uniforms {
        match uniforms
            .iter()
            .find(|u| u.group == decl.group && u.binding == decl.binding)
        {
            Some(existing) if existing == decl => {}
            Some(existing) => {
                return Err(format!(
                    "binding @group({}) @binding({}) is `{}` in the vertex stage but `{}` in the fragment stage",
                    decl.group, decl.binding, existing.name, decl.name
                ));
            }
            None => uniforms.push(decl.clone()),
        }
    }

    Ok(ProgramLayout {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        inputs: vertex.inputs.clone(),
        uniforms,
    })
}

fn collect_located(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<Varying>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Varying {
            name: name.map(str::to_owned),
            location: *location,
            components: components_of(module, ty),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_located(module, member.name.as_deref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn components_of(module: &Module, ty: Handle<Type>) -> u32 {
    match module.types[ty].inner {
        TypeInner::Scalar(_) => 1,
        TypeInner::Vector { size, .. } => size as u32,
        _ => 0,
    }
}

fn collect_uniforms(
    module: &Module,
    info: &ModuleInfo,
    entry_index: usize,
) -> Result<Vec<UniformDecl>, String> {
    let uses = info.get_entry_point(entry_index);
    let mut uniforms = Vec::new();

    for (handle, global) in module.global_variables.iter() {
        if uses[handle].is_empty() {
            continue;
        }
        let Some(binding) = &global.binding else { continue };
        let name = global.name.clone().unwrap_or_default();

        if global.space != AddressSpace::Uniform {
            return Err(format!(
                "resource `{name}` uses an unsupported address space; only uniform buffers are bindable"
            ));
        }
        if binding.group > MAX_BIND_GROUP {
            return Err(format!("uniform `{name}` uses bind group {}", binding.group));
        }

        uniforms.push(UniformDecl {
            name,
            group: binding.group,
            binding: binding.binding,
            size: u64::from(module.types[global.ty].inner.size(module.to_ctx())),
        });
    }

    Ok(uniforms)
}
