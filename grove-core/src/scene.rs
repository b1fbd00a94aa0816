//! The whole pipeline, and the host-owned state that swaps its results.
//!
//! [`Snapshot::build`] runs validate → derive → grow → tessellate → index
//! as one step. [`Grove`] keeps the current snapshot behind an [`Arc`] and
//! replaces it in a single assignment, so a renderer holding a snapshot
//! never sees a mesh and a picking index from different loads.

use crate::{
    config::Config,
    error::{LoadError, StructuralError},
    genealogy::{Genealogy, GenealogyDocument, PersonInfo},
    growth,
    mesh::Mesh,
    picking::{PickHit, PickingIndex, Ray},
    skeleton::Skeleton,
    tessellation,
    types::PersonId,
};
use glam::Vec3;
use std::sync::Arc;

/// One consistent generation of every derived structure.
#[derive(Debug, Clone)]
pub struct Snapshot {
    genealogy: Genealogy,
    skeleton: Skeleton,
    mesh: Mesh,
    index: PickingIndex,
    config: Config,
}

impl Snapshot {
    /// Validates `doc` and derives geometry from it.
    pub fn build(doc: GenealogyDocument, config: &Config) -> Result<Self, StructuralError> {
        Ok(Self::from_genealogy(Genealogy::load(doc)?, config))
    }

    /// Derives geometry from an already validated genealogy.
    pub fn from_genealogy(genealogy: Genealogy, config: &Config) -> Self {
        let config = config.sanitized();
        let skeleton = growth::grow(&genealogy, &config.prominence, &config.growth);
        let mesh = tessellation::tessellate(&skeleton, &config.mesh, config.growth.seed);
        let index = PickingIndex::build(&skeleton);

        log::info!(
            "built '{}': {} people, {} segments, {} joints, {} vertices, {} triangles",
            genealogy.name().unwrap_or(genealogy.root_id()),
            genealogy.len(),
            skeleton.len(),
            skeleton.joints.len(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        Self {
            genealogy,
            skeleton,
            mesh,
            index,
            config,
        }
    }

    pub fn genealogy(&self) -> &Genealogy {
        &self.genealogy
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn index(&self) -> &PickingIndex {
        &self.index
    }

    /// The sanitized config this snapshot was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pick_hit(&self, origin: Vec3, direction: Vec3) -> Option<PickHit> {
        self.index.pick(origin, direction)
    }

    /// Person whose branch the ray hits first.
    pub fn pick(&self, origin: Vec3, direction: Vec3) -> Option<&str> {
        let hit = self.pick_hit(origin, direction)?;
        Some(self.skeleton.segments[hit.segment].person_id.as_str())
    }

    pub fn pick_ray(&self, ray: &Ray) -> Option<&str> {
        let hit = self.index.pick_ray(ray)?;
        Some(self.skeleton.segments[hit.segment].person_id.as_str())
    }

    pub fn info(&self, person_id: &str) -> Option<PersonInfo> {
        self.genealogy.info(person_id)
    }
}

/// Host state: the active configuration and the current snapshot.
#[derive(Debug, Clone, Default)]
pub struct Grove {
    config: Config,
    current: Option<Arc<Snapshot>>,
}

impl Grove {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            current: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current snapshot, if anything has been loaded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.clone()
    }

    /// Replaces the family. On error the previous snapshot stays active.
    ///
    /// ### Parameters
    /// - `doc` - Family document; validated before anything is grown.
    ///
    /// ### Returns
    /// The newly installed snapshot, or the [`StructuralError`] that
    /// rejected `doc`.
    pub fn load(&mut self, doc: GenealogyDocument) -> Result<Arc<Snapshot>, StructuralError> {
        match Snapshot::build(doc, &self.config) {
            Ok(snapshot) => Ok(self.install(snapshot)),
            Err(err) => {
                log::warn!("family rejected, keeping the current tree: {err}");
                Err(err)
            }
        }
    }

    /// Parses and loads a JSON family document.
    pub fn load_json(&mut self, text: &str) -> Result<Arc<Snapshot>, LoadError> {
        let doc = GenealogyDocument::from_json(text).inspect_err(|err| {
            log::warn!("family document is not valid JSON, keeping the current tree: {err}");
        })?;
        Ok(self.load(doc)?)
    }

    /// Parses and loads a YAML family file.
    pub fn load_yaml(&mut self, text: &str) -> Result<Arc<Snapshot>, LoadError> {
        let doc = GenealogyDocument::from_yaml(text).inspect_err(|err| {
            log::warn!("family file is not valid YAML, keeping the current tree: {err}");
        })?;
        Ok(self.load(doc)?)
    }

    /// Changes the configuration and regrows the current family with it.
    pub fn set_config(&mut self, config: Config) -> Option<Arc<Snapshot>> {
        self.config = config;
        self.regenerate()
    }

    /// Rebuilds the current family with the current configuration.
    pub fn regenerate(&mut self) -> Option<Arc<Snapshot>> {
        let genealogy = self.current.as_ref()?.genealogy().clone();
        let snapshot = Snapshot::from_genealogy(genealogy, &self.config);
        Some(self.install(snapshot))
    }

    pub fn pick(&self, origin: Vec3, direction: Vec3) -> Option<PersonId> {
        self.current.as_ref()?.pick(origin, direction).map(str::to_string)
    }

    pub fn info(&self, person_id: &str) -> Option<PersonInfo> {
        self.current.as_ref()?.info(person_id)
    }

    fn install(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genealogy::Person;

    fn family() -> GenealogyDocument {
        GenealogyDocument::new("a")
            .person(Person::new("a", "Ada").with_children(["b", "c"]))
            .person(Person::new("b", "Ben").with_years(Some(1900), Some(1980)))
            .person(Person::new("c", "Cy").with_biography("Sailed twice around the world."))
    }

    #[test]
    fn empty_grove_answers_nothing() {
        let grove = Grove::default();
        assert!(grove.snapshot().is_none());
        assert!(grove.pick(Vec3::ZERO, Vec3::Y).is_none());
        assert!(grove.info("a").is_none());
    }

    #[test]
    fn load_builds_every_stage() {
        let mut grove = Grove::default();
        let snap = grove.load(family()).unwrap();
        assert_eq!(snap.skeleton().len(), 3);
        assert_eq!(snap.index().len(), 3);
        assert_eq!(snap.mesh().seams.len(), 1);
        assert!(!snap.mesh().is_empty());
        assert!(Arc::ptr_eq(&snap, &grove.snapshot().unwrap()));
    }

    #[test]
    fn failed_load_keeps_previous_snapshot() {
        let mut grove = Grove::default();
        let before = grove.load(family()).unwrap();

        let broken =
            GenealogyDocument::new("a").person(Person::new("a", "A").with_children(["ghost"]));
        let err = grove.load(broken).unwrap_err();
        assert!(matches!(err, StructuralError::DanglingChild { .. }));
        assert!(Arc::ptr_eq(&before, &grove.snapshot().unwrap()));

        let err = grove.load_json("{ not json").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
        assert!(Arc::ptr_eq(&before, &grove.snapshot().unwrap()));
    }

    #[test]
    fn load_yaml_installs_family_file() {
        let yaml = r#"
family: { name: Pair, root: a }
people:
  - { id: a, name: Ada, children: [b] }
  - { id: b, name: Ben }
"#;
        let mut grove = Grove::default();
        let snap = grove.load_yaml(yaml).unwrap();
        assert_eq!(snap.genealogy().name(), Some("Pair"));
        assert_eq!(snap.skeleton().len(), 2);

        let err = grove.load_yaml("family: [").unwrap_err();
        assert!(matches!(err, LoadError::Yaml(_)));
        assert!(Arc::ptr_eq(&snap, &grove.snapshot().unwrap()));
    }

    #[test]
    fn info_formats_lifespan() {
        let mut grove = Grove::default();
        grove.load(family()).unwrap();
        let info = grove.info("b").unwrap();
        assert_eq!(info.name, "Ben");
        assert_eq!(info.lifespan.to_string(), "1900 - 1980");
        assert!(grove.info("nobody").is_none());
    }

    #[test]
    fn pick_names_the_person() {
        let mut grove = Grove::default();
        let snap = grove.load(family()).unwrap();
        let root = snap.skeleton().root().unwrap();
        let side = root.direction().any_orthonormal_vector();
        let origin = root.midpoint() + side * 10.0;
        assert_eq!(grove.pick(origin, -side).as_deref(), Some("a"));
        assert!(grove.pick(origin, side).is_none());
    }

    #[test]
    fn regenerate_swaps_in_new_geometry() {
        let mut grove = Grove::default();
        let first = grove.load(family()).unwrap();
        let mut cfg = *grove.config();
        cfg.mesh.radial_segments = 6;
        let second = grove.set_config(cfg).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.mesh().vertex_count() < first.mesh().vertex_count());
        // The old snapshot is untouched for anyone still holding it.
        assert_eq!(first.config().mesh.radial_segments, 12);
    }

    #[test]
    fn identical_input_gives_identical_snapshots() {
        let cfg = Config::default();
        let a = Snapshot::build(family(), &cfg).unwrap();
        let b = Snapshot::build(family(), &cfg).unwrap();
        assert_eq!(a.mesh().vertex_bytes(), b.mesh().vertex_bytes());
        assert_eq!(a.skeleton(), b.skeleton());
    }
}
