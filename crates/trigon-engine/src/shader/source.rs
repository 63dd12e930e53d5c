/// Name of the per-vertex position input.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Name of the per-vertex color input.
pub const COLOR_ATTRIBUTE: &str = "color";

/// Name of the model-view-projection uniform.
pub const MVP_UNIFORM: &str = "mvpMatrix";

/// A vertex/fragment source pair handed to the compiler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

impl ShaderSources {
    /// WGSL pair for the colored triangle.
    pub const TRIANGLE: ShaderSources = ShaderSources {
        vertex: include_str!("shaders/triangle_vs.wgsl"),
        fragment: include_str!("shaders/triangle_fs.wgsl"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_sources_mention_the_host_names() {
        let vs = ShaderSources::TRIANGLE.vertex;
        assert!(vs.contains(POSITION_ATTRIBUTE));
        assert!(vs.contains(COLOR_ATTRIBUTE));
        assert!(vs.contains(MVP_UNIFORM));
    }
}
