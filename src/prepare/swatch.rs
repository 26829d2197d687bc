use crate::material::{Material, MaterialIndex};

use std::collections::HashMap;
use std::sync::Arc;

/// Frozen per-pack material table: a dense index for every distinct
/// material the pack's geometry references, plus the subset that emits.
pub struct PreparedSwatch {
    materials: Vec<Arc<dyn Material>>,
    emissive: Vec<MaterialIndex>,
}

impl PreparedSwatch {
    pub fn material(&self, index: MaterialIndex) -> &dyn Material {
        &*self.materials[index.get()]
    }

    pub fn count(&self) -> usize {
        self.materials.len()
    }

    /// Indices of materials with positive emission.
    pub fn emissive_indices(&self) -> &[MaterialIndex] {
        &self.emissive
    }

    pub fn is_emissive(&self, index: MaterialIndex) -> bool {
        self.materials[index.get()].is_emissive()
    }
}

/// Builds a swatch while geometry is extracted: repeated registrations of
/// the same material (by identity) collapse onto one index.
#[derive(Default)]
pub struct SwatchExtractor {
    indices: HashMap<usize, MaterialIndex>,
    materials: Vec<Arc<dyn Material>>,
}

impl SwatchExtractor {
    pub fn new() -> Self {
        SwatchExtractor::default()
    }

    pub fn register(&mut self, material: &Arc<dyn Material>) -> MaterialIndex {
        let key = Arc::as_ptr(material) as *const () as usize;
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }

        let index = MaterialIndex(self.materials.len() as u32);
        self.indices.insert(key, index);
        self.materials.push(material.clone());
        index
    }

    pub fn finish(self) -> PreparedSwatch {
        let emissive = self
            .materials
            .iter()
            .enumerate()
            .filter(|(_, material)| material.is_emissive())
            .map(|(i, _)| MaterialIndex(i as u32))
            .collect();

        PreparedSwatch {
            materials: self.materials,
            emissive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RGB128;
    use crate::material::{Emitter, Matte};

    #[test]
    fn repeated_materials_share_an_index() {
        let matte: Arc<dyn Material> = Arc::new(Matte::new(RGB128::splat(0.5)));
        let other: Arc<dyn Material> = Arc::new(Matte::new(RGB128::splat(0.5)));

        let mut extractor = SwatchExtractor::new();
        let a = extractor.register(&matte);
        let b = extractor.register(&matte);
        let c = extractor.register(&other);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(extractor.finish().count(), 2);
    }

    #[test]
    fn emissive_detection_uses_positive_radiance() {
        let matte: Arc<dyn Material> = Arc::new(Matte::new(RGB128::splat(0.5)));
        let bright: Arc<dyn Material> = Arc::new(Emitter::new(RGB128::splat(3.)));
        let dark: Arc<dyn Material> = Arc::new(Emitter::new(RGB128::black()));

        let mut extractor = SwatchExtractor::new();
        extractor.register(&matte);
        let bright_index = extractor.register(&bright);
        extractor.register(&dark);

        let swatch = extractor.finish();
        assert_eq!(swatch.emissive_indices(), &[bright_index]);
        assert!(swatch.is_emissive(bright_index));
    }
}
