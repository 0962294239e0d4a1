//! Runtime link wrappers.

use armature_defs::Link;

use crate::anchor::Anchor;

/// Live state of one link of a multibody entity.
#[derive(Debug, Clone)]
pub struct LinkEntity {
    id: String,
    name: String,
    parent: Option<String>,
    offset: Anchor,
    anchor: Anchor,
    motors: Vec<String>,
}

impl LinkEntity {
    /// Wrap a blueprint link. `id` is the scene-wide id.
    pub fn from_definition(id: impl Into<String>, link: &Link) -> Self {
        let offset = Anchor::new(link.origin, link.orientation());
        Self {
            id: id.into(),
            name: link.name.clone(),
            parent: link.parent.clone(),
            offset,
            anchor: offset,
            motors: Vec::new(),
        }
    }

    /// Scene-wide id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name within the definition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent link name.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Pose relative to the parent as given by the blueprint.
    pub fn offset(&self) -> &Anchor {
        &self.offset
    }

    /// Current global pose.
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Overwrite the global pose.
    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.anchor = anchor;
    }

    /// Names of the joints this link is the parent of.
    pub fn motors(&self) -> &[String] {
        &self.motors
    }

    pub(crate) fn connect_motor(&mut self, joint: impl Into<String>) {
        self.motors.push(joint.into());
    }

    pub(crate) fn reset(&mut self) {
        self.anchor = self.offset;
    }
}
