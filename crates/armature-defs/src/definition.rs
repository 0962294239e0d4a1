//! The parsed multibody blueprint.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::warn;

use crate::joint::JointDefinition;
use crate::link::Link;

/// An articulated body as described by one definition document.
///
/// Definitions are cached by the [`MultibodyEntityDatabase`](crate::MultibodyEntityDatabase)
/// and shared between entities; each entity keeps its own runtime state.
#[derive(Debug, Clone)]
pub struct MultibodyDefinition {
    name: String,
    file_name: String,
    links: BTreeMap<String, Link>,
    joints: BTreeMap<String, JointDefinition>,
    mass: MassCache,
}

impl MultibodyDefinition {
    /// Create an empty definition.
    pub fn new(name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            links: BTreeMap::new(),
            joints: BTreeMap::new(),
            mass: MassCache::default(),
        }
    }

    /// Entity name from the document root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source the definition was read from.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Links by name.
    pub fn links(&self) -> &BTreeMap<String, Link> {
        &self.links
    }

    /// Joints by name.
    pub fn joints(&self) -> &BTreeMap<String, JointDefinition> {
        &self.joints
    }

    /// Look up a link.
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    /// Look up a joint.
    pub fn joint(&self, name: &str) -> Option<&JointDefinition> {
        self.joints.get(name)
    }

    /// Add a link, replacing any link of the same name. Invalidates the
    /// cached total mass.
    pub fn add_link(&mut self, link: Link) {
        if self.links.contains_key(&link.name) {
            warn!("Link {} redefined in {}", link.name, self.file_name);
        }
        self.links.insert(link.name.clone(), link);
        self.mass.invalidate();
    }

    /// Add a joint, replacing any joint of the same name.
    pub fn add_joint(&mut self, joint: JointDefinition) {
        if self.joints.contains_key(&joint.name) {
            warn!("Joint {} redefined in {}", joint.name, self.file_name);
        }
        self.joints.insert(joint.name.clone(), joint);
    }

    /// Fill each link's parent from the joints. Links not named as a child
    /// remain roots.
    pub fn assign_parents(&mut self) {
        for joint in self.joints.values() {
            if let Some(child) = self.links.get_mut(&joint.child) {
                child.parent = Some(joint.parent.clone());
            }
        }
    }

    /// The unique link without a parent. `None` if there are no links or
    /// more than one root.
    pub fn root_link(&self) -> Option<&Link> {
        let mut roots = self.links.values().filter(|link| link.is_root());
        match (roots.next(), roots.next()) {
            (Some(root), None) => Some(root),
            _ => None,
        }
    }

    /// Joints whose parent is `link`.
    pub fn children_of<'a>(&'a self, link: &'a str) -> impl Iterator<Item = &'a JointDefinition> + 'a {
        self.joints.values().filter(move |joint| joint.parent == link)
    }

    /// Total mass of all links, recomputed only after links change.
    pub fn mass(&self) -> f64 {
        self.mass
            .get_or_compute(|| self.links.values().map(|link| link.mass).sum())
    }
}

#[derive(Debug, Default)]
struct MassCache {
    value: OnceLock<f64>,
    #[cfg(test)]
    recomputes: std::sync::atomic::AtomicUsize,
}

impl MassCache {
    fn get_or_compute(&self, compute: impl FnOnce() -> f64) -> f64 {
        *self.value.get_or_init(|| {
            #[cfg(test)]
            self.recomputes
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            compute()
        })
    }

    fn invalidate(&mut self) {
        self.value = OnceLock::new();
    }
}

impl Clone for MassCache {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            #[cfg(test)]
            recomputes: std::sync::atomic::AtomicUsize::new(
                self.recomputes.load(std::sync::atomic::Ordering::Relaxed),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::{JointLimit, JointType};
    use nalgebra::Vector3;
    use std::sync::atomic::Ordering;

    fn link(name: &str, mass: f64) -> Link {
        Link {
            mass,
            ..Link::new(name)
        }
    }

    fn joint(name: &str, parent: &str, child: &str) -> JointDefinition {
        JointDefinition {
            name: name.into(),
            joint_type: JointType::Continuous,
            parent: parent.into(),
            child: child.into(),
            origin: Vector3::zeros(),
            rpy: Vector3::zeros(),
            axis: Vector3::x(),
            damping: 0.0,
            friction: 0.0,
            limit: JointLimit::default(),
        }
    }

    #[test]
    fn test_mass_is_cached_until_link_added() {
        let mut def = MultibodyDefinition::new("bot", "bot.xml");
        def.add_link(link("a", 1.5));
        def.add_link(link("b", 2.0));

        assert_eq!(def.mass(), 3.5);
        assert_eq!(def.mass(), 3.5);
        assert_eq!(def.mass.recomputes.load(Ordering::Relaxed), 1);

        def.add_link(link("c", 0.5));
        assert_eq!(def.mass(), 4.0);
        assert_eq!(def.mass.recomputes.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_root_and_children() {
        let mut def = MultibodyDefinition::new("bot", "bot.xml");
        def.add_link(link("base", 1.0));
        def.add_link(link("arm", 1.0));
        def.add_link(link("hand", 1.0));
        assert!(def.root_link().is_none());

        def.add_joint(joint("shoulder", "base", "arm"));
        def.add_joint(joint("wrist", "arm", "hand"));
        def.assign_parents();

        assert_eq!(def.root_link().unwrap().name, "base");
        assert_eq!(def.link("hand").unwrap().parent.as_deref(), Some("arm"));
        let children: Vec<_> = def.children_of("arm").map(|j| j.name.as_str()).collect();
        assert_eq!(children, ["wrist"]);
    }

    #[test]
    fn test_redefined_link_replaces() {
        let mut def = MultibodyDefinition::new("bot", "bot.xml");
        def.add_link(link("a", 1.0));
        def.add_link(link("a", 5.0));
        assert_eq!(def.links().len(), 1);
        assert_eq!(def.mass(), 5.0);
    }
}
