use glam::Vec3;
use pathtracer_shared::{MaterialRecord, SphereRecord};

use crate::error::RendererError;

/// Sphere primitive
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub position: Vec3,
    pub radius: f32,
    /// Index into [`Scene::materials`]
    pub material_index: u32,
}

/// Surface description shared by any number of meshes
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub albedo: Vec3,
    /// 0 is a perfect mirror, 1 is fully diffuse
    pub roughness: f32,
    pub emission_color: Vec3,
    pub emission_strength: f32,
}

impl Sphere {
    pub fn new(position: Vec3, radius: f32, material_index: u32) -> Self {
        Self {
            position,
            radius,
            material_index,
        }
    }

    pub fn to_record(&self) -> SphereRecord {
        SphereRecord::new(self.position.to_array(), self.radius, self.material_index)
    }

    #[cfg(test)]
    pub fn from_record(record: &SphereRecord) -> Self {
        Self::new(Vec3::from(record.center), record.radius, record.material_index())
    }
}

impl Material {
    pub fn new(albedo: Vec3, roughness: f32, emission_color: Vec3, emission_strength: f32) -> Self {
        Self {
            albedo,
            roughness,
            emission_color,
            emission_strength,
        }
    }

    pub fn diffuse(albedo: Vec3) -> Self {
        Self::new(albedo, 1.0, Vec3::ZERO, 0.0)
    }

    pub fn metallic(albedo: Vec3, roughness: f32) -> Self {
        Self::new(albedo, roughness, Vec3::ZERO, 0.0)
    }

    pub fn emissive(emission_color: Vec3, emission_strength: f32) -> Self {
        Self::new(Vec3::ZERO, 1.0, emission_color, emission_strength)
    }

    pub fn to_record(&self) -> MaterialRecord {
        MaterialRecord::new(
            self.albedo.to_array(),
            self.roughness,
            self.emission_color.to_array(),
            self.emission_strength,
        )
    }

    #[cfg(test)]
    pub fn from_record(record: &MaterialRecord) -> Self {
        Self::new(
            Vec3::from(record.albedo),
            record.roughness,
            Vec3::from(record.emission_color),
            record.emission_strength,
        )
    }
}

/// Ordered meshes and materials. Indices are insertion positions and never
/// change; the scene is append-only.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    meshes: Vec<Sphere>,
    materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene by running a construction routine on an empty one
    pub fn populate(init: impl FnOnce(&mut Scene)) -> Self {
        let mut scene = Self::new();
        init(&mut scene);
        scene
    }

    pub fn add_mesh(&mut self, mesh: Sphere) -> u32 {
        self.meshes.push(mesh);
        (self.meshes.len() - 1) as u32
    }

    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    pub fn meshes(&self) -> &[Sphere] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn mesh_records(&self) -> Vec<SphereRecord> {
        self.meshes.iter().map(Sphere::to_record).collect()
    }

    pub fn material_records(&self) -> Vec<MaterialRecord> {
        self.materials.iter().map(Material::to_record).collect()
    }

    /// Meshes packed as [`SphereRecord::FLOATS`] floats each, in index order
    pub fn serialize_meshes(&self) -> Vec<f32> {
        bytemuck::cast_slice(&self.mesh_records()).to_vec()
    }

    /// Materials packed as [`MaterialRecord::FLOATS`] floats each, in index order
    pub fn serialize_materials(&self) -> Vec<f32> {
        bytemuck::cast_slice(&self.material_records()).to_vec()
    }

    /// Check that every mesh references an existing material
    pub fn validate(&self) -> Result<(), RendererError> {
        let material_count = self.materials.len();
        for (mesh, sphere) in self.meshes.iter().enumerate() {
            if sphere.material_index as usize >= material_count {
                return Err(RendererError::InvalidSceneReference {
                    mesh,
                    material: sphere.material_index,
                    material_count,
                });
            }
        }
        Ok(())
    }
}

/// Demo scene: a small sphere resting on a large ground sphere, lit by an
/// emissive sphere above and to the left.
pub fn default_scene(scene: &mut Scene) {
    let ground = scene.add_material(Material::diffuse(Vec3::new(0.75, 0.7, 0.65)));
    let subject = scene.add_material(Material::metallic(Vec3::new(0.9, 0.35, 0.25), 0.3));
    let light = scene.add_material(Material::emissive(Vec3::new(1.0, 0.9, 0.7), 6.0));

    scene.add_mesh(Sphere::new(Vec3::new(0.0, -11.0, 0.0), 10.0, ground));
    scene.add_mesh(Sphere::new(Vec3::ZERO, 1.0, subject));
    scene.add_mesh(Sphere::new(Vec3::new(-4.0, 6.0, -3.0), 2.5, light));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sphere_scene(scene: &mut Scene) {
        let floor = scene.add_material(Material::diffuse(Vec3::new(0.8, 0.8, 0.8)));
        let ball = scene.add_material(Material::new(Vec3::new(1.0, 0.2, 0.2), 0.25, Vec3::ONE, 2.0));
        scene.add_mesh(Sphere::new(Vec3::new(0.0, -10.0, 0.0), 10.0, floor));
        scene.add_mesh(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, ball));
    }

    #[test]
    fn test_serialized_lengths() {
        let scene = Scene::populate(two_sphere_scene);

        assert_eq!(scene.serialize_meshes().len(), 16);
        assert_eq!(scene.serialize_materials().len(), 24);
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let mut scene = Scene::new();
        assert_eq!(scene.add_material(Material::diffuse(Vec3::ONE)), 0);
        assert_eq!(scene.add_material(Material::diffuse(Vec3::ZERO)), 1);
        assert_eq!(scene.add_mesh(Sphere::new(Vec3::ZERO, 1.0, 1)), 0);
        assert_eq!(scene.add_mesh(Sphere::new(Vec3::X, 2.0, 0)), 1);

        let floats = scene.serialize_meshes();
        assert_eq!(&floats[..8], &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(&floats[8..], &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mesh_round_trip() {
        let scene = Scene::populate(two_sphere_scene);
        let floats = scene.serialize_meshes();

        for (index, mesh) in scene.meshes().iter().enumerate() {
            let record = SphereRecord::from_floats(&floats[index * SphereRecord::FLOATS..]).unwrap();
            assert_eq!(Sphere::from_record(&record), *mesh);
        }
    }

    #[test]
    fn test_material_round_trip() {
        let scene = Scene::populate(two_sphere_scene);
        let floats = scene.serialize_materials();

        for (index, material) in scene.materials().iter().enumerate() {
            let record = MaterialRecord::from_floats(&floats[index * MaterialRecord::FLOATS..]).unwrap();
            assert_eq!(Material::from_record(&record), *material);
        }
    }

    #[test]
    fn test_material_layout_offsets() {
        let material = Material::new(Vec3::new(0.1, 0.2, 0.3), 0.4, Vec3::new(0.5, 0.6, 0.7), 8.0);
        let mut scene = Scene::new();
        scene.add_material(material);

        let floats = scene.serialize_materials();
        assert_eq!(&floats[0..3], &[0.1, 0.2, 0.3]);
        assert_eq!(&floats[4..7], &[0.5, 0.6, 0.7]);
        assert_eq!(floats[8], 0.4);
        assert_eq!(floats[9], 8.0);
    }

    #[test]
    fn test_validate_rejects_dangling_material() {
        let mut scene = Scene::populate(two_sphere_scene);
        assert!(scene.validate().is_ok());

        scene.add_mesh(Sphere::new(Vec3::ZERO, 0.5, 5));
        match scene.validate() {
            Err(RendererError::InvalidSceneReference {
                mesh,
                material,
                material_count,
            }) => {
                assert_eq!(mesh, 2);
                assert_eq!(material, 5);
                assert_eq!(material_count, 2);
            }
            other => panic!("unexpected validation result: {:?}", other),
        }
    }

    #[test]
    fn test_default_scene_is_valid() {
        let scene = Scene::populate(default_scene);
        assert_eq!(scene.meshes().len(), 3);
        assert!(scene.validate().is_ok());
        assert!(scene.materials().iter().any(|material| material.emission_strength > 0.0));
    }
}
