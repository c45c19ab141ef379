//! Demo content: the shuttle mesh and its texture, with procedural fallbacks.

use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::Vec3;
use streak_engine::scene::{ImageData, MeshData, MeshVertex};

/// Environment variable naming an optional PNG to use instead of the checker.
pub const TEXTURE_ENV: &str = "STREAK_TEXTURE";

/// Environment variable naming an optional OBJ model to use instead of the box.
pub const MESH_ENV: &str = "STREAK_MESH";

/// Box with roughly the shuttle's proportions.
const FALLBACK_HALF_EXTENTS: Vec3 = Vec3::new(1.0, 4.0, 1.0);

/// Axis-aligned box centered on the origin, outward CCW faces, one UV square per face.
pub fn box_mesh(half_extents: Vec3) -> MeshData {
    // (normal, u, v) with u x v == normal, so corners in u/v order wind CCW from outside.
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut mesh = MeshData::default();
    for (normal, u, v) in FACES {
        let base = mesh.vertices.len() as u32;
        for (cu, cv) in CORNERS {
            let p = (normal + u * cu + v * cv) * half_extents;
            mesh.vertices.push(MeshVertex {
                position: p.to_array(),
                color: [255; 4],
                uv: [(cu + 1.0) * 0.5, (1.0 - cv) * 0.5],
                normal: normal.to_array(),
            });
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Decodes OBJ text into one triangle list. Materials are ignored; every
/// model in the file is appended with its indices rebased.
pub fn parse_obj(src: &str, name: &str) -> Result<MeshData> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj_buf(&mut src.as_bytes(), &options, |_| {
        Ok((Vec::new(), Default::default()))
    })
    .with_context(|| format!("failed to parse OBJ {name}"))?;
    if models.is_empty() {
        bail!("no meshes in OBJ {name}");
    }

    let mut mesh = MeshData::default();
    for model in models {
        let m = model.mesh;
        let base = u32::try_from(mesh.vertices.len()).context("OBJ has too many vertices")?;
        let count = m.positions.len() / 3;

        for i in 0..count {
            let normal = m.normals.get(3 * i..3 * i + 3).map_or([0.0, 1.0, 0.0], |n| [n[0], n[1], n[2]]);
            // OBJ texture rows run bottom to top.
            let uv = m.texcoords.get(2 * i..2 * i + 2).map_or([0.0, 0.0], |t| [t[0], 1.0 - t[1]]);
            mesh.vertices.push(MeshVertex {
                position: [m.positions[3 * i], m.positions[3 * i + 1], m.positions[3 * i + 2]],
                color: [255; 4],
                uv,
                normal,
            });
        }

        if m.indices.is_empty() {
            mesh.indices.extend((0..count as u32).map(|i| base + i));
        } else {
            mesh.indices.extend(m.indices.iter().map(|&i| base + i));
        }
    }

    mesh.validate().with_context(|| format!("OBJ {name} is not a usable mesh"))?;
    Ok(mesh)
}

pub fn load_obj(path: &Path) -> Result<MeshData> {
    let src = std::fs::read_to_string(path).with_context(|| format!("failed to read OBJ {}", path.display()))?;
    let mesh = parse_obj(&src, &path.display().to_string())?;
    log::info!(
        "loaded mesh with {} vertices, {} triangles from {}",
        mesh.vertices.len(),
        mesh.indices.len() / 3,
        path.display()
    );
    Ok(mesh)
}

/// The OBJ named by [`MESH_ENV`] if it loads, otherwise a box.
pub fn demo_mesh() -> MeshData {
    if let Some(path) = std::env::var_os(MESH_ENV) {
        match load_obj(Path::new(&path)) {
            Ok(mesh) => return mesh,
            Err(err) => log::warn!("{err:#}; falling back to box mesh"),
        }
    }
    box_mesh(FALLBACK_HALF_EXTENTS)
}

/// Two-tone checkerboard, `cells` squares per side.
pub fn checker_texture(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> ImageData {
    let size = size.max(1);
    let cell = (size / cells.max(1)).max(1);

    let mut rgba8 = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            rgba8.extend_from_slice(if even { &a } else { &b });
        }
    }
    ImageData { width: size, height: size, rgba8 }
}

pub fn load_png(path: &Path) -> Result<ImageData> {
    let img = image::open(path).with_context(|| format!("failed to decode image {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::info!("loaded texture {}x{} from {}", width, height, path.display());
    Ok(ImageData { width, height, rgba8: rgba.into_raw() })
}

/// The PNG named by [`TEXTURE_ENV`] if it loads, otherwise a checkerboard.
pub fn demo_texture() -> ImageData {
    if let Some(path) = std::env::var_os(TEXTURE_ENV) {
        match load_png(Path::new(&path)) {
            Ok(img) => return img,
            Err(err) => log::warn!("{err:#}; falling back to checker texture"),
        }
    }
    checker_texture(256, 8, [235, 235, 240, 255], [40, 44, 52, 255])
}
