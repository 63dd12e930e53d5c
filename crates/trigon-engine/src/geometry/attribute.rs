use crate::device::{AttribSlot, BufferId};
use crate::error::RenderError;
use crate::shader::{COLOR_ATTRIBUTE, POSITION_ATTRIBUTE};

/// One vertex attribute stream before upload.
///
/// `data` holds `components` floats per vertex, vertices back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub components: u32,
    pub data: Vec<f32>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, components: u32, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            components,
            data,
        }
    }

    /// Number of vertices described by `data`.
    ///
    /// Rejects component counts outside `1..=4` and data that is empty or not
    /// an exact multiple of the component count.
    pub fn vertex_count(&self) -> Result<usize, RenderError> {
        let len = self.data.len();
        let components = self.components as usize;
        if !(1..=4).contains(&components) || len == 0 || len % components != 0 {
            return Err(RenderError::MalformedAttribute {
                name: self.name.clone(),
                components: self.components,
                len,
            });
        }
        Ok(len / components)
    }
}

/// Checks every spec and that they all describe the same number of vertices.
pub fn validate(specs: &[AttributeSpec]) -> Result<usize, RenderError> {
    let mut expected: Option<usize> = None;
    for spec in specs {
        let found = spec.vertex_count()?;
        match expected {
            None => expected = Some(found),
            Some(expected) if expected != found => {
                return Err(RenderError::VertexCountMismatch {
                    name: spec.name.clone(),
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }
    }
    Ok(expected.unwrap_or(0))
}

/// An attribute after upload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundAttribute {
    /// `None` when the program does not declare the attribute.
    pub slot: Option<AttribSlot>,
    pub components: u32,
    pub buffer: BufferId,
}

/// The fixed triangle: top, right, left.
pub fn triangle_attributes() -> [AttributeSpec; 2] {
    #[rustfmt::skip]
    let position = vec![
         0.0, 2.0, 0.0, // top
         1.5, 0.0, 0.0, // right
        -0.5, 0.0, 0.0, // left
    ];
    #[rustfmt::skip]
    let color = vec![
        1.0, 0.1, 0.0, 1.0, // top
        0.0, 1.0, 0.0, 1.0, // right
        0.0, 0.0, 1.0, 1.0, // left
    ];

    [
        AttributeSpec::new(POSITION_ATTRIBUTE, 3, position),
        AttributeSpec::new(COLOR_ATTRIBUTE, 4, color),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_has_three_vertices_per_stream() {
        let [position, color] = triangle_attributes();
        assert_eq!(position.data.len(), 9);
        assert_eq!(color.data.len(), 12);
        assert_eq!(validate(&triangle_attributes()).unwrap(), 3);
    }

    #[test]
    fn rejects_length_not_multiple_of_components() {
        let spec = AttributeSpec::new("position", 3, vec![0.0; 8]);
        assert_eq!(
            spec.vertex_count(),
            Err(RenderError::MalformedAttribute {
                name: "position".into(),
                components: 3,
                len: 8,
            })
        );
    }

    #[test]
    fn rejects_empty_data_and_bad_component_counts() {
        assert!(AttributeSpec::new("a", 3, vec![]).vertex_count().is_err());
        assert!(AttributeSpec::new("a", 0, vec![1.0]).vertex_count().is_err());
        assert!(AttributeSpec::new("a", 5, vec![1.0; 10]).vertex_count().is_err());
    }

    #[test]
    fn rejects_mismatched_vertex_counts() {
        let specs = [
            AttributeSpec::new("position", 3, vec![0.0; 9]),
            AttributeSpec::new("color", 4, vec![0.0; 8]),
        ];
        assert_eq!(
            validate(&specs),
            Err(RenderError::VertexCountMismatch {
                name: "color".into(),
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn no_specs_means_no_vertices() {
        assert_eq!(validate(&[]).unwrap(), 0);
    }
}
