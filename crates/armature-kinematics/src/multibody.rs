//! Multibody entities and forward kinematics.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use armature_defs::MultibodyDefinition;
use tracing::{debug, warn};

use crate::anchor::{Anchor, EmbodiedEntity};
use crate::error::SceneError;
use crate::link::LinkEntity;
use crate::motor::MotorActuator;

/// An articulated body in the scene: one [`LinkEntity`] per blueprint link
/// and one [`MotorActuator`] per blueprint joint.
///
/// The entity itself has no body. Its pose is the pose of the root link with
/// the root's blueprint offset removed.
#[derive(Debug, Clone)]
pub struct MultibodyEntity {
    embodied: EmbodiedEntity,
    definition: Arc<MultibodyDefinition>,
    root: String,
    links: BTreeMap<String, LinkEntity>,
    motors: BTreeMap<String, MotorActuator>,
}

impl MultibodyEntity {
    /// Instantiate a definition at `anchor`.
    ///
    /// Link and joint ids are `"{id}.{name}"`.
    pub fn new(
        id: impl Into<String>,
        definition: Arc<MultibodyDefinition>,
        anchor: Anchor,
        movable: bool,
    ) -> Result<Self, SceneError> {
        let id = id.into();
        let root = definition
            .root_link()
            .ok_or_else(|| SceneError::NoRootLink {
                entity: id.clone(),
                file: definition.file_name().to_string(),
            })?
            .name
            .clone();

        let mut links: BTreeMap<String, LinkEntity> = definition
            .links()
            .values()
            .map(|link| {
                let wrapper = LinkEntity::from_definition(format!("{id}.{}", link.name), link);
                (link.name.clone(), wrapper)
            })
            .collect();

        let mut motors = BTreeMap::new();
        for joint in definition.joints().values() {
            if let Some(parent) = links.get_mut(&joint.parent) {
                parent.connect_motor(joint.name.clone());
            }
            let motor = MotorActuator::from_definition(format!("{id}.{}", joint.name), joint);
            motors.insert(joint.name.clone(), motor);
        }

        let mut entity = Self {
            embodied: EmbodiedEntity::new(id, anchor, movable),
            definition,
            root,
            links,
            motors,
        };
        entity.reset();
        debug!(
            "Created multibody {} with {} links and {} motors",
            entity.id(),
            entity.links.len(),
            entity.motors.len()
        );
        Ok(entity)
    }

    /// Entity id.
    pub fn id(&self) -> &str {
        self.embodied.id()
    }

    /// Embodiment.
    pub fn embodied(&self) -> &EmbodiedEntity {
        &self.embodied
    }

    /// Mutable embodiment. Writing the origin here does not move the links.
    pub fn embodied_mut(&mut self) -> &mut EmbodiedEntity {
        &mut self.embodied
    }

    /// The shared blueprint.
    pub fn definition(&self) -> &Arc<MultibodyDefinition> {
        &self.definition
    }

    /// Name of the root link.
    pub fn root_link(&self) -> &str {
        &self.root
    }

    /// Links by name.
    pub fn links(&self) -> &BTreeMap<String, LinkEntity> {
        &self.links
    }

    /// Look up a link.
    pub fn link(&self, name: &str) -> Option<&LinkEntity> {
        self.links.get(name)
    }

    /// Look up a link mutably.
    pub fn link_mut(&mut self, name: &str) -> Option<&mut LinkEntity> {
        self.links.get_mut(name)
    }

    /// Motors by joint name.
    pub fn motors(&self) -> &BTreeMap<String, MotorActuator> {
        &self.motors
    }

    /// Look up a motor.
    pub fn motor(&self, name: &str) -> Option<&MotorActuator> {
        self.motors.get(name)
    }

    /// Look up a motor mutably.
    pub fn motor_mut(&mut self, name: &str) -> Option<&mut MotorActuator> {
        self.motors.get_mut(name)
    }

    /// Return every link and motor to the blueprint state and place the tree
    /// at the initial pose.
    pub fn reset(&mut self) {
        self.embodied.reset();
        for link in self.links.values_mut() {
            link.reset();
        }
        for motor in self.motors.values_mut() {
            motor.reset();
        }
        self.update_kinematics();
    }

    /// Move the entity and re-place the tree around the new pose.
    pub fn move_to(&mut self, anchor: Anchor) {
        self.embodied.set_origin_anchor(anchor);
        self.update_kinematics();
    }

    /// Place the root at the entity pose and propagate to every link through
    /// the joints, depth first.
    ///
    /// A child is placed at `parent ∘ joint origin ∘ rotation(axis, angle)`.
    pub fn update_kinematics(&mut self) {
        let Some(root) = self.links.get_mut(&self.root) else {
            return;
        };
        let placed = self.embodied.origin_anchor().compose(root.offset());
        root.set_anchor(placed);

        let mut pending = vec![self.root.clone()];
        let mut visited = HashSet::new();
        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                warn!("Link {} of {} reached twice", name, self.embodied.id());
                continue;
            }
            let Some(parent) = self.links.get(&name) else {
                continue;
            };
            let parent_anchor = *parent.anchor();
            let children: Vec<(String, Anchor)> = parent
                .motors()
                .iter()
                .filter_map(|joint| self.motors.get(joint))
                .map(|motor| {
                    let (position, orientation) = motor.child_offset();
                    let anchor = parent_anchor.compose(&Anchor::new(position, orientation));
                    (motor.child().to_string(), anchor)
                })
                .collect();

            for (child, anchor) in children {
                if let Some(link) = self.links.get_mut(&child) {
                    link.set_anchor(anchor);
                    pending.push(child);
                }
            }
        }
    }

    /// Derive the entity pose from the root link's current pose.
    pub fn sync_origin_from_root(&mut self) {
        if let Some(root) = self.links.get(&self.root) {
            let offset = root.offset().isometry();
            let origin = root.anchor().isometry() * offset.inverse();
            self.embodied.set_origin_anchor(Anchor::from_isometry(&origin));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armature_defs::MultibodyEntityDatabase;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::f64::consts::FRAC_PI_2;

    const ARM: &str = r#"<entity name="arm">
        <material name="m"><contact_coefficients mu="0.5" kd="0.5"/></material>
        <link name="base">
            <material name="m"/>
            <visual><geometry><box size="1 1 1"/></geometry></visual>
        </link>
        <link name="upper">
            <material name="m"/>
            <visual><geometry><box size="1 0.1 0.1"/></geometry></visual>
        </link>
        <link name="lower">
            <material name="m"/>
            <visual><geometry><box size="1 0.1 0.1"/></geometry></visual>
        </link>
        <joint name="shoulder" type="continuous">
            <parent link="base"/><child link="upper"/>
            <origin xyz="1 0 0"/>
            <axis xyz="0 0 1"/>
            <limit velocity="1"/>
        </joint>
        <joint name="elbow" type="continuous">
            <parent link="upper"/><child link="lower"/>
            <origin xyz="1 0 0" rpy="0.3 0 0"/>
            <axis xyz="0 0 1"/>
            <limit velocity="1"/>
        </joint>
    </entity>"#;

    fn arm(anchor: Anchor) -> MultibodyEntity {
        let mut database = MultibodyEntityDatabase::with_seed(0);
        let definition = database.parse_str("arm.xml", ARM).unwrap();
        MultibodyEntity::new("arm0", definition, anchor, true).unwrap()
    }

    #[test]
    fn test_forward_kinematics_quarter_turn() {
        let mut entity = arm(Anchor::identity());
        entity.motor_mut("shoulder").unwrap().set_position_current(FRAC_PI_2);
        entity.update_kinematics();

        let upper = entity.link("upper").unwrap().anchor();
        let quarter = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert_relative_eq!(upper.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(upper.orientation, quarter, epsilon = 1e-12);

        // The elbow offset now points along +Y, and its static roll composes
        // before its own (zero) spin.
        let lower = entity.link("lower").unwrap().anchor();
        assert_relative_eq!(lower.position, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        let roll = UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0);
        assert_relative_eq!(lower.orientation, quarter * roll, epsilon = 1e-12);
    }

    #[test]
    fn test_root_follows_entity_pose() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let entity = arm(Anchor::new(Vector3::new(0.0, 0.0, 2.0), yaw));

        let base = entity.link("base").unwrap().anchor();
        assert_relative_eq!(base.position, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-12);
        let upper = entity.link("upper").unwrap().anchor();
        assert_relative_eq!(upper.position, Vector3::new(0.0, 1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_reset_and_move() {
        let mut entity = arm(Anchor::identity());
        entity.motor_mut("shoulder").unwrap().set_position_current(1.0);
        entity.move_to(Anchor::at(5.0, 0.0, 0.0));
        assert_relative_eq!(
            entity.link("base").unwrap().anchor().position,
            Vector3::new(5.0, 0.0, 0.0)
        );

        entity.reset();
        assert_eq!(entity.motor("shoulder").unwrap().current_position(), 0.0);
        assert_relative_eq!(
            entity.link("lower").unwrap().anchor().position,
            Vector3::new(2.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_eq!(entity.embodied().origin_anchor(), &Anchor::identity());
    }

    #[test]
    fn test_ids_and_structure() {
        let entity = arm(Anchor::identity());
        assert_eq!(entity.root_link(), "base");
        assert_eq!(entity.link("upper").unwrap().id(), "arm0.upper");
        assert_eq!(entity.motor("elbow").unwrap().id(), "arm0.elbow");
        assert_eq!(entity.link("base").unwrap().motors(), ["shoulder".to_string()]);
        assert!(entity.link("lower").unwrap().motors().is_empty());
    }

    #[test]
    fn test_origin_tracks_root() {
        let mut entity = arm(Anchor::identity());
        let moved = Anchor::at(0.0, 3.0, 0.0);
        entity.link_mut("base").unwrap().set_anchor(moved);
        entity.sync_origin_from_root();
        assert_relative_eq!(
            entity.embodied().origin_anchor().position,
            Vector3::new(0.0, 3.0, 0.0)
        );
    }

    #[test]
    fn test_no_root() {
        let mut database = MultibodyEntityDatabase::with_seed(0);
        let definition = database
            .parse_str(
                "twins.xml",
                r#"<entity name="twins">
                    <link name="a"><visual><geometry><sphere radius="1"/></geometry><material name="m"/></visual></link>
                    <link name="b"><visual><geometry><sphere radius="1"/></geometry><material name="m"/></visual></link>
                </entity>"#,
            )
            .unwrap();
        assert!(matches!(
            MultibodyEntity::new("t", definition, Anchor::identity(), true),
            Err(SceneError::NoRootLink { .. })
        ));
    }
}
