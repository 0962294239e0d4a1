//! Definition document parser.
//!
//! A document looks like:
//!
//! ```xml
//! <entity name="rover">
//!   <material name="rubber">
//!     <contact_coefficients mu="0.9" kp="1000" kd="0.4" mu_std="0.05"/>
//!     <color rgba="0.1 0.1 0.1 1"/>
//!   </material>
//!   <link name="chassis">
//!     <material name="rubber"/>
//!     <inertial>
//!       <origin xyz="0 0 0.05"/>
//!       <mass value="2"/>
//!       <inertia ixx="0.1" ixy="0" ixz="0" iyy="0.1" iyz="0" izz="0.1"/>
//!     </inertial>
//!     <visual>
//!       <origin xyz="0 0 0.05" rpy="0 0 0"/>
//!       <geometry><box size="0.4 0.2 0.1"/></geometry>
//!     </visual>
//!   </link>
//!   <joint name="axle" type="continuous">
//!     <parent link="chassis"/>
//!     <child link="wheel"/>
//!     <origin xyz="0.1 0.15 0" rpy="0 0 0"/>
//!     <axis xyz="0 1 0"/>
//!     <limit velocity="10" effort="5"/>
//!   </joint>
//! </entity>
//! ```
//!
//! Materials declared at the root are visible everywhere; materials declared
//! in a link or in a visual/collision block shadow outer ones for the extent
//! of that element only.

use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use rand::RngCore;
use tracing::{debug, warn};

use crate::definition::MultibodyDefinition;
use crate::error::{DefinitionError, ParseErrorKind, Result};
use crate::geometry::{GeometrySpecification, Shape};
use crate::joint::{JointDefinition, JointLimit, JointType};
use crate::link::{Inertia, Link};
use crate::material::{MaterialColour, MaterialPrototype, MaterialPrototypeStack, MaterialProperties};
use crate::mesh::{MeshCache, MeshLoader};
use crate::text::{parse_float, parse_floats, parse_vector3};
use crate::xml::{self, Element};

/// Everything the parser borrows from its session.
pub struct ParseContext<'a> {
    /// Directory relative mesh paths are resolved against.
    pub base_dir: Option<&'a Path>,
    /// Session mesh cache.
    pub meshes: &'a mut MeshCache,
    /// Mesh loader.
    pub loader: &'a dyn MeshLoader,
    /// Random source for material instances.
    pub rng: &'a mut dyn RngCore,
}

/// Parse a definition document.
///
/// `file_name` only labels diagnostics and the resulting definition.
pub fn parse_definition(
    source: &str,
    file_name: &str,
    context: ParseContext<'_>,
) -> Result<MultibodyDefinition> {
    let root = xml::parse_document(source).map_err(|message| DefinitionError::Xml {
        file: file_name.to_string(),
        message,
    })?;

    let mut parser = Parser {
        entity: String::new(),
        file: file_name.to_string(),
        context,
        materials: MaterialPrototypeStack::new(),
    };
    parser.parse_entity(&root)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Visual,
    Collision,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Visual => "visual",
            Role::Collision => "collision",
        }
    }
}

struct Parser<'a> {
    entity: String,
    file: String,
    context: ParseContext<'a>,
    materials: MaterialPrototypeStack,
}

impl Parser<'_> {
    fn parse_entity(&mut self, root: &Element) -> Result<MultibodyDefinition> {
        if root.name != "entity" {
            return Err(self.error(ParseErrorKind::missing_element("entity", "document root")));
        }
        self.entity = self.required(root, "name")?.to_string();

        let mut definition = MultibodyDefinition::new(&self.entity, &self.file);

        self.parse_materials(root)?;

        for element in root.children_named("link") {
            let link = self.parse_link(element)?;
            debug!(
                "Parsed link {} ({} visual, {} collision, mass {})",
                link.name,
                link.visual.len(),
                link.collision.len(),
                link.mass
            );
            definition.add_link(link);
        }

        for element in root.children_named("joint") {
            let joint = self.parse_joint(element, &definition)?;
            debug!(
                "Parsed joint {} ({}: {} -> {})",
                joint.name,
                joint.joint_type.as_str(),
                joint.parent,
                joint.child
            );
            definition.add_joint(joint);
        }

        definition.assign_parents();
        Ok(definition)
    }

    fn parse_materials(&mut self, element: &Element) -> Result<()> {
        for material in element.children_named("material") {
            let name = self.required(material, "name")?;
            let mut prototype = MaterialPrototype::default();

            if let Some(coefficients) = material.child("contact_coefficients") {
                prototype.mean = MaterialProperties {
                    friction: self.optional_float(coefficients, "mu")?,
                    stiffness: self.optional_float(coefficients, "kp")?,
                    dampening: self.optional_float(coefficients, "kd")?,
                };
                prototype.std_dev = MaterialProperties {
                    friction: self.optional_float(coefficients, "mu_std")?,
                    stiffness: self.optional_float(coefficients, "kp_std")?,
                    dampening: self.optional_float(coefficients, "kd_std")?,
                };
            }
            if let Some(color) = material.child("color") {
                let [r, g, b, a] = self.floats::<4>(color, "rgba")?;
                prototype.colour = MaterialColour::new(r, g, b, a);
            }

            self.materials.set_material(name, prototype);
        }
        Ok(())
    }

    fn parse_link(&mut self, element: &Element) -> Result<Link> {
        let mut link = Link::new(self.required(element, "name")?);

        self.materials.push_scope();
        self.parse_materials(element)?;

        (link.origin, link.rpy) = self.origin(element)?;

        if let Some(inertial) = element.child("inertial") {
            let context = format!("inertial of link {}", link.name);
            let mass = inertial
                .child("mass")
                .ok_or_else(|| self.error(ParseErrorKind::missing_element("mass", &context)))?;
            link.mass = self.float(mass, "value")?;

            let inertia = inertial
                .child("inertia")
                .ok_or_else(|| self.error(ParseErrorKind::missing_element("inertia", &context)))?;
            link.inertia = Inertia {
                ixx: self.float(inertia, "ixx")?,
                ixy: self.float(inertia, "ixy")?,
                ixz: self.float(inertia, "ixz")?,
                iyy: self.float(inertia, "iyy")?,
                iyz: self.float(inertia, "iyz")?,
                izz: self.float(inertia, "izz")?,
            };
            link.inertia_provided = true;
            link.cog = self.origin(inertial)?.0;
        }

        let visuals: Vec<&Element> = element.children_named("visual").collect();
        let collisions: Vec<&Element> = element.children_named("collision").collect();
        if visuals.is_empty() && collisions.is_empty() {
            return Err(self.error(ParseErrorKind::NoShapeDefinition { link: link.name }));
        }

        // A block given for one role alone serves both.
        let visual_source = if visuals.is_empty() { &collisions } else { &visuals };
        let collision_source = if collisions.is_empty() { &visuals } else { &collisions };
        for block in visual_source {
            let spec = self.parse_geometry(block, element, &link.name, Role::Visual)?;
            link.visual.push(spec);
        }
        for block in collision_source {
            let spec = self.parse_geometry(block, element, &link.name, Role::Collision)?;
            link.collision.push(spec);
        }

        match element.child("material").and_then(|m| m.attribute("name")) {
            Some(name) => {
                match self.materials.material_instance(name, &mut *self.context.rng) {
                    Some(instance) => link.collision_material = instance,
                    None => warn!("Link {} references undefined material {}", link.name, name),
                }
            }
            None => warn!("Link {} has no collision material", link.name),
        }

        self.materials.pop_scope();
        Ok(link)
    }

    fn parse_geometry(
        &mut self,
        block: &Element,
        link_element: &Element,
        link: &str,
        role: Role,
    ) -> Result<GeometrySpecification> {
        self.materials.push_scope();
        self.parse_materials(block)?;

        let (origin, rpy) = self.origin(block)?;
        let context = format!("{} block of link {}", role.as_str(), link);
        let geometry = block
            .child("geometry")
            .ok_or_else(|| self.error(ParseErrorKind::missing_element("geometry", &context)))?;
        let shape_element = geometry.first_child().ok_or_else(|| {
            self.error(ParseErrorKind::missing_element("box|cylinder|sphere|mesh", &context))
        })?;
        let shape = self.parse_shape(shape_element, link)?;

        let colour = match role {
            Role::Visual => Some(self.resolve_colour(block, link_element, link)?),
            Role::Collision => None,
        };

        self.materials.pop_scope();
        Ok(GeometrySpecification {
            shape,
            origin,
            rpy,
            colour,
        })
    }

    fn parse_shape(&mut self, element: &Element, link: &str) -> Result<Shape> {
        match element.name.as_str() {
            "box" => Ok(Shape::Box {
                size: self.vector(element, "size")?,
            }),
            "cylinder" => Ok(Shape::Cylinder {
                radius: self.float(element, "radius")?,
                length: self.float(element, "length")?,
            }),
            "sphere" => Ok(Shape::Sphere {
                radius: self.float(element, "radius")?,
            }),
            "mesh" => {
                let filename = self.required(element, "filename")?.to_string();
                let scale = match element.attribute("scale") {
                    Some(_) => self.vector(element, "scale")?,
                    None => Vector3::repeat(1.0),
                };
                let path = self.resolve_path(&filename);
                if !self.context.loader.supports(&path) {
                    return Err(self.error(ParseErrorKind::UnsupportedMesh { filename }));
                }
                let mesh = self
                    .context
                    .meshes
                    .get_or_load(&path, self.context.loader)
                    .map_err(|source| {
                        self.error(ParseErrorKind::MeshLoad {
                            filename: filename.clone(),
                            source,
                        })
                    })?;
                Ok(Shape::Mesh {
                    mesh,
                    filename: path,
                    scale,
                })
            }
            other => Err(self.error(ParseErrorKind::UnknownGeometry {
                link: link.to_string(),
                shape: other.to_string(),
            })),
        }
    }

    /// Colour from the block's own material, else the link's.
    fn resolve_colour(
        &self,
        block: &Element,
        link_element: &Element,
        link: &str,
    ) -> Result<MaterialColour> {
        let unresolved = || {
            self.error(ParseErrorKind::UnresolvedMaterial {
                link: link.to_string(),
            })
        };
        let material = block
            .child("material")
            .or_else(|| link_element.child("material"))
            .ok_or_else(unresolved)?;
        let name = self.required(material, "name")?;
        self.materials
            .material_definition(name)
            .map(|prototype| prototype.colour)
            .ok_or_else(unresolved)
    }

    fn parse_joint(&mut self, element: &Element, definition: &MultibodyDefinition) -> Result<JointDefinition> {
        let name = self.required(element, "name")?.to_string();
        let type_name = self.required(element, "type")?;
        let joint_type = JointType::parse(type_name).ok_or_else(|| {
            self.error(ParseErrorKind::UnknownJointType {
                joint: name.clone(),
                joint_type: type_name.to_string(),
            })
        })?;

        let (origin, rpy) = self.origin(element)?;
        let context = format!("joint {name}");

        let parent = self.link_reference(element, "parent", &context)?;
        let child = self.link_reference(element, "child", &context)?;
        for (role, link) in [("parent", &parent), ("child", &child)] {
            if definition.link(link).is_none() {
                return Err(self.error(ParseErrorKind::UndefinedLink {
                    joint: name,
                    role,
                    link: link.clone(),
                }));
            }
        }

        let axis = match element.child("axis") {
            Some(axis) => self.vector(axis, "xyz")?,
            None => Vector3::x(),
        };

        let (damping, friction) = match element.child("dynamics") {
            Some(dynamics) => (
                self.present_float(dynamics, "damping")?.unwrap_or(0.0),
                self.present_float(dynamics, "friction")?.unwrap_or(0.0),
            ),
            None => (0.0, 0.0),
        };

        let mut limit = JointLimit::default();
        match element.child("limit") {
            Some(limit_element) => {
                if let Some(lower) = self.present_float(limit_element, "lower")? {
                    limit.lower = lower;
                }
                if let Some(upper) = self.present_float(limit_element, "upper")? {
                    limit.upper = upper;
                }
                if let Some(effort) = self.present_float(limit_element, "effort")? {
                    limit.effort = effort;
                }
                limit.velocity = self.float(limit_element, "velocity")?;
            }
            None if joint_type.requires_limit() => {
                return Err(self.error(ParseErrorKind::missing_element("limit", &context)));
            }
            None => {}
        }

        if !joint_type.is_supported() {
            return Err(self.error(ParseErrorKind::UnsupportedJointType {
                joint: name,
                joint_type: joint_type.as_str(),
            }));
        }

        Ok(JointDefinition {
            name,
            joint_type,
            parent,
            child,
            origin,
            rpy,
            axis,
            damping,
            friction,
            limit,
        })
    }

    fn link_reference(&self, joint: &Element, tag: &'static str, context: &str) -> Result<String> {
        let element = joint
            .child(tag)
            .ok_or_else(|| self.error(ParseErrorKind::missing_element(tag, context)))?;
        Ok(self.required(element, "link")?.to_string())
    }

    fn origin(&self, parent: &Element) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let Some(origin) = parent.child("origin") else {
            return Ok((Vector3::zeros(), Vector3::zeros()));
        };
        let xyz = match origin.attribute("xyz") {
            Some(_) => self.vector(origin, "xyz")?,
            None => Vector3::zeros(),
        };
        let rpy = match origin.attribute("rpy") {
            Some(_) => self.vector(origin, "rpy")?,
            None => Vector3::zeros(),
        };
        Ok((xyz, rpy))
    }

    fn resolve_path(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        match self.context.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn required<'e>(&self, element: &'e Element, attribute: &'static str) -> Result<&'e str> {
        element
            .attribute(attribute)
            .ok_or_else(|| self.error(ParseErrorKind::missing_attribute(attribute, &element.name)))
    }

    fn float(&self, element: &Element, attribute: &'static str) -> Result<f64> {
        let text = self.required(element, attribute)?;
        parse_float(text).map_err(|message| self.invalid(element, attribute, message))
    }

    /// Attribute value, `None` when absent.
    fn present_float(&self, element: &Element, attribute: &'static str) -> Result<Option<f64>> {
        element
            .attribute(attribute)
            .map(|text| parse_float(text).map_err(|message| self.invalid(element, attribute, message)))
            .transpose()
    }

    /// Attribute value, unset (`NaN`) when absent.
    fn optional_float(&self, element: &Element, attribute: &'static str) -> Result<f64> {
        Ok(self.present_float(element, attribute)?.unwrap_or(f64::NAN))
    }

    fn floats<const N: usize>(&self, element: &Element, attribute: &'static str) -> Result<[f64; N]> {
        let text = self.required(element, attribute)?;
        parse_floats::<N>(text).map_err(|message| self.invalid(element, attribute, message))
    }

    fn vector(&self, element: &Element, attribute: &'static str) -> Result<Vector3<f64>> {
        let text = self.required(element, attribute)?;
        parse_vector3(text).map_err(|message| self.invalid(element, attribute, message))
    }

    fn invalid(&self, element: &Element, attribute: &'static str, message: String) -> DefinitionError {
        self.error(ParseErrorKind::invalid_attribute(attribute, &element.name, message))
    }

    fn error(&self, kind: ParseErrorKind) -> DefinitionError {
        DefinitionError::Parse {
            entity: self.entity.clone(),
            file: self.file.clone(),
            kind,
        }
    }
}
