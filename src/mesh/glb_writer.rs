use std::borrow::Cow;
use std::collections::BTreeMap;

use gltf::binary::{Glb, Header};
use gltf_json::accessor::{ComponentType, GenericComponentType, Type as AccessorType};
use gltf_json::buffer::{Target, View};
use gltf_json::mesh::{Mode, Primitive, Semantic};
use gltf_json::validation::{Checked, USize64};
use gltf_json::Index;
use serde_json::json;

use crate::error::{FootprintTilerError, Result};
use crate::transform::z_up_to_y_up;
use crate::types::{Attributes, IndexedMesh};

const MESHOPT_EXT: &str = "EXT_meshopt_compression";

/// Neutral facade colour for the material stub.
const BUILDING_BASE_COLOR: [f32; 4] = [0.82, 0.80, 0.76, 1.0];

/// Serialize a Z-up `IndexedMesh` into a self-contained GLB (glTF 2.0).
///
/// The document holds one buffer, a POSITION accessor with min/max, an index
/// accessor, an opaque material stub, and one mesh/node/scene. `metadata` is
/// attached to the node as `extras`. Positions are rotated into glTF's Y-up
/// frame; indices are u16 when the mesh has at most 65535 vertices. Normals
/// are omitted; viewers derive flat normals from the winding.
pub fn write_glb(mesh: &IndexedMesh, metadata: &Attributes) -> Result<Vec<u8>> {
    write_glb_impl(mesh, metadata, false)
}

/// Like [`write_glb`], with indices reordered for the vertex cache and every
/// buffer view meshopt-encoded under `EXT_meshopt_compression`.
///
/// The views then describe the decoded layout in a data-less fallback buffer;
/// the encoded bytes live in the GLB binary chunk.
pub fn write_glb_compressed(mesh: &IndexedMesh, metadata: &Attributes) -> Result<Vec<u8>> {
    write_glb_impl(mesh, metadata, true)
}

fn write_glb_impl(mesh: &IndexedMesh, metadata: &Attributes, compress: bool) -> Result<Vec<u8>> {
    if mesh.is_empty() {
        return Err(FootprintTilerError::EmptyContent);
    }
    let vertex_count = mesh.vertex_count();

    let mut positions = mesh.positions.clone();
    z_up_to_y_up(&mut positions);
    let indices = if compress {
        meshopt::optimize_vertex_cache(&mesh.indices, vertex_count)
    } else {
        mesh.indices.clone()
    };

    let mut builder = GlbBuilder::new(compress);

    // POSITION
    let encoded_positions = if compress {
        let vertices: &[[f32; 3]] = bytemuck::cast_slice(&positions);
        let bytes = meshopt::encode_vertex_buffer(vertices)
            .map_err(|e| FootprintTilerError::Encoding(format!("meshopt vertices: {e:?}")))?;
        Some((bytes, "ATTRIBUTES"))
    } else {
        None
    };
    let position_view = builder.push_view(
        bytemuck::cast_slice(&positions),
        12,
        Target::ArrayBuffer,
        encoded_positions,
    );
    let position_accessor = builder.root.push(accessor(
        position_view,
        vertex_count,
        ComponentType::F32,
        AccessorType::Vec3,
        Some(position_bounds(&positions)),
    ));

    // Indices
    let (index_bytes, index_component, index_stride) = if vertex_count <= u16::MAX as usize {
        let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
        (bytemuck::cast_slice(&narrow).to_vec(), ComponentType::U16, 2)
    } else {
        (bytemuck::cast_slice(&indices).to_vec(), ComponentType::U32, 4)
    };
    let encoded_indices = if compress {
        let bytes = meshopt::encode_index_buffer(&indices, vertex_count)
            .map_err(|e| FootprintTilerError::Encoding(format!("meshopt indices: {e:?}")))?;
        Some((bytes, "TRIANGLES"))
    } else {
        None
    };
    let index_view = builder.push_view(
        &index_bytes,
        index_stride,
        Target::ElementArrayBuffer,
        encoded_indices,
    );
    let index_accessor = builder.root.push(accessor(
        index_view,
        indices.len(),
        index_component,
        AccessorType::Scalar,
        None,
    ));

    let material = builder.root.push(building_material());

    let mut attributes = BTreeMap::new();
    attributes.insert(Checked::Valid(Semantic::Positions), position_accessor);
    let gltf_mesh = builder.root.push(gltf_json::Mesh {
        primitives: vec![Primitive {
            attributes,
            indices: Some(index_accessor),
            material: Some(material),
            mode: Checked::Valid(Mode::Triangles),
            targets: None,
            extensions: Default::default(),
            extras: Default::default(),
        }],
        weights: None,
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });

    let extras = if metadata.is_empty() {
        None
    } else {
        Some(
            serde_json::value::to_raw_value(metadata)
                .map_err(|e| FootprintTilerError::Encoding(format!("metadata: {e}")))?,
        )
    };
    let node = builder.root.push(gltf_json::Node {
        mesh: Some(gltf_mesh),
        extras,
        ..Default::default()
    });
    let scene = builder.root.push(gltf_json::Scene {
        nodes: vec![node],
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });
    builder.root.scene = Some(scene);

    builder.finish()
}

/// Accumulates the glTF document and its binary chunk.
struct GlbBuilder {
    root: gltf_json::Root,
    /// Buffer 0, stored as the GLB BIN chunk.
    bin: Vec<u8>,
    /// Byte length of buffer 1, the fallback buffer. Only used when compressing.
    fallback_len: usize,
    compress: bool,
}

impl GlbBuilder {
    fn new(compress: bool) -> Self {
        let root = gltf_json::Root {
            asset: gltf_json::Asset {
                version: "2.0".into(),
                generator: Some("footprint-tiler".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        Self {
            root,
            bin: Vec::new(),
            fallback_len: 0,
            compress,
        }
    }

    /// Add a buffer view for `raw`. With `encoded` set, the view describes
    /// `raw`'s layout in the fallback buffer and its extension points at the
    /// encoded bytes in the binary chunk.
    fn push_view(
        &mut self,
        raw: &[u8],
        stride: usize,
        target: Target,
        encoded: Option<(Vec<u8>, &'static str)>,
    ) -> Index<View> {
        pad_to_four(&mut self.bin, 0);

        let (buffer, byte_offset, extensions) = match encoded {
            Some((bytes, mode)) => {
                let encoded_offset = self.bin.len();
                self.bin.extend_from_slice(&bytes);

                let fallback_offset = self.fallback_len.next_multiple_of(4);
                self.fallback_len = fallback_offset + raw.len();

                let mut others = serde_json::Map::new();
                others.insert(
                    MESHOPT_EXT.into(),
                    json!({
                        "buffer": 0,
                        "byteOffset": encoded_offset,
                        "byteLength": bytes.len(),
                        "byteStride": stride,
                        "count": raw.len() / stride,
                        "mode": mode
                    }),
                );
                (
                    Index::new(1),
                    fallback_offset,
                    Some(gltf_json::extensions::buffer::View { others }),
                )
            }
            None => {
                let offset = self.bin.len();
                self.bin.extend_from_slice(raw);
                (Index::new(0), offset, None)
            }
        };

        self.root.push(View {
            buffer,
            byte_length: USize64::from(raw.len()),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None,
            name: None,
            target: Some(Checked::Valid(target)),
            extensions,
            extras: Default::default(),
        })
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        pad_to_four(&mut self.bin, 0);
        self.root.push(gltf_json::Buffer {
            byte_length: USize64::from(self.bin.len()),
            uri: None,
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });

        if self.compress {
            let mut others = serde_json::Map::new();
            others.insert(MESHOPT_EXT.into(), json!({ "fallback": true }));
            self.root.push(gltf_json::Buffer {
                byte_length: USize64::from(self.fallback_len.next_multiple_of(4)),
                uri: None,
                name: None,
                extensions: Some(gltf_json::extensions::buffer::Buffer { others }),
                extras: Default::default(),
            });
            self.root.extensions_used.push(MESHOPT_EXT.into());
            self.root.extensions_required.push(MESHOPT_EXT.into());
        }

        let mut json = gltf_json::serialize::to_vec(&self.root)
            .map_err(|e| FootprintTilerError::Encoding(format!("glTF JSON: {e}")))?;
        pad_to_four(&mut json, b' ');

        // header + JSON chunk header + JSON + BIN chunk header + BIN
        let length = 12 + 8 + json.len() + 8 + self.bin.len();
        let length = u32::try_from(length)
            .map_err(|_| FootprintTilerError::Encoding(format!("GLB too large: {length} bytes")))?;
        let glb = Glb {
            header: Header {
                magic: *b"glTF",
                version: 2,
                length,
            },
            json: Cow::Owned(json),
            bin: Some(Cow::Owned(self.bin)),
        };
        glb.to_vec()
            .map_err(|e| FootprintTilerError::Encoding(format!("GLB container: {e}")))
    }
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    let len = bytes.len().next_multiple_of(4);
    bytes.resize(len, fill);
}

fn accessor(
    view: Index<View>,
    count: usize,
    component: ComponentType,
    type_: AccessorType,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> gltf_json::Accessor {
    gltf_json::Accessor {
        buffer_view: Some(view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(count),
        component_type: Checked::Valid(GenericComponentType(component)),
        type_: Checked::Valid(type_),
        min: bounds.map(|(min, _)| json!(min)),
        max: bounds.map(|(_, max)| json!(max)),
        name: None,
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// Opaque, single-sided, non-metallic material shared by every building.
fn building_material() -> gltf_json::Material {
    use gltf_json::material::{
        AlphaMode, EmissiveFactor, PbrBaseColorFactor, PbrMetallicRoughness, StrengthFactor,
    };

    gltf_json::Material {
        pbr_metallic_roughness: PbrMetallicRoughness {
            base_color_factor: PbrBaseColorFactor(BUILDING_BASE_COLOR),
            metallic_factor: StrengthFactor(0.0),
            roughness_factor: StrengthFactor(1.0),
            base_color_texture: None,
            metallic_roughness_texture: None,
            extensions: Default::default(),
            extras: Default::default(),
        },
        alpha_mode: Checked::Valid(AlphaMode::Opaque),
        alpha_cutoff: None,
        double_sided: false,
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: EmissiveFactor([0.0, 0.0, 0.0]),
        name: Some("building".into()),
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// Per-axis min/max of a flat xyz array.
fn position_bounds(positions: &[f32]) -> ([f32; 3], [f32; 3]) {
    positions.chunks_exact(3).fold(
        ([f32::INFINITY; 3], [f32::NEG_INFINITY; 3]),
        |(mut min, mut max), p| {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
            (min, max)
        },
    )
}
