use std::borrow::Cow;

use wgpu::naga::ShaderStage;

const VERTEX_SHADER_GLSL: &str = include_str!("../shaders/fullscreen.vert");
const HEADER: &str = include_str!("../shaders/header.glsl");
const COMMON: &str = include_str!("../shaders/common.glsl");
const GRADIENT_BODY: &str = include_str!("../shaders/gradient.frag");
const GLOW_BODY: &str = include_str!("../shaders/glow.frag");

/// The two fragment programs drawn each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentProgram {
    Gradient,
    Glow,
}

impl FragmentProgram {
    fn label(self) -> &'static str {
        match self {
            FragmentProgram::Gradient => "neue-lava gradient fragment",
            FragmentProgram::Glow => "neue-lava glow fragment",
        }
    }

    fn body(self) -> &'static str {
        match self {
            FragmentProgram::Gradient => GRADIENT_BODY,
            FragmentProgram::Glow => GLOW_BODY,
        }
    }
}

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    program: FragmentProgram,
) -> wgpu::ShaderModule {
    let source = assemble_fragment(program);
    tracing::debug!(program = ?program, bytes = source.len(), "compiling fragment shader");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.label()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Prepends the uniform block and shared helpers to a program body.
///
/// `#line 1` resets line numbers so compiler errors point into the body.
fn assemble_fragment(program: FragmentProgram) -> String {
    format!("{HEADER}\n{COMMON}\n#line 1\n{}", program.body())
}
