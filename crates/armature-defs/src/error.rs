//! Error types for definition parsing.

use thiserror::Error;

use crate::mesh::MeshError;

/// Result type for definition operations.
pub type Result<T> = std::result::Result<T, DefinitionError>;

/// Errors that can occur while reading a multibody definition.
///
/// Every variant is a configuration failure: the definition is rejected and
/// nothing is cached, so the caller is expected to stop before simulating.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// The definition file could not be read.
    #[error("Failed to read definition file {file}: {source}")]
    Io {
        /// Path of the definition file.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML.
    #[error("Malformed document {file}: {message}")]
    Xml {
        /// Path of the definition file.
        file: String,
        /// Reader diagnostic.
        message: String,
    },

    /// The document is well-formed but describes an invalid entity.
    #[error("{kind} when parsing entity ({entity} in file {file})")]
    Parse {
        /// Name of the entity being parsed, empty if the root has no name yet.
        entity: String,
        /// Path of the definition file.
        file: String,
        /// What was wrong.
        #[source]
        kind: ParseErrorKind,
    },
}

/// The specific reason a definition was rejected.
#[derive(Error, Debug)]
pub enum ParseErrorKind {
    /// A required element is missing.
    #[error("Missing <{element}> element in {context}")]
    MissingElement {
        /// Element tag that was expected.
        element: &'static str,
        /// Where it was expected.
        context: String,
    },

    /// A required attribute is missing.
    #[error("Missing '{attribute}' attribute on <{element}>")]
    MissingAttribute {
        /// Attribute name.
        attribute: &'static str,
        /// Element tag.
        element: String,
    },

    /// An attribute could not be parsed.
    #[error("Invalid '{attribute}' attribute on <{element}>: {message}")]
    InvalidAttribute {
        /// Attribute name.
        attribute: &'static str,
        /// Element tag.
        element: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A link has neither visual nor collision geometry.
    #[error("No shape definition (visual or collision) for link {link}")]
    NoShapeDefinition {
        /// Link name.
        link: String,
    },

    /// A geometry element uses an unknown shape tag.
    #[error("Unknown geometry type <{shape}> in link {link}")]
    UnknownGeometry {
        /// Link name.
        link: String,
        /// Offending tag.
        shape: String,
    },

    /// A visual block has no material to take its colour from.
    #[error("No material for visual geometry of link {link}")]
    UnresolvedMaterial {
        /// Link name.
        link: String,
    },

    /// The mesh file extension is not supported.
    #[error("Unsupported mesh format: {filename}")]
    UnsupportedMesh {
        /// Mesh file name as written in the document.
        filename: String,
    },

    /// The mesh file could not be loaded.
    #[error("Failed to load mesh {filename}: {source}")]
    MeshLoad {
        /// Mesh file name as written in the document.
        filename: String,
        /// Loader error.
        #[source]
        source: MeshError,
    },

    /// A joint type name is not one of the known kinds.
    #[error("Unknown type '{joint_type}' for joint {joint}")]
    UnknownJointType {
        /// Joint name.
        joint: String,
        /// Offending type string.
        joint_type: String,
    },

    /// A joint type parses but cannot be simulated.
    #[error("Joint type '{joint_type}' for joint {joint} is not yet supported")]
    UnsupportedJointType {
        /// Joint name.
        joint: String,
        /// Type name.
        joint_type: &'static str,
    },

    /// A joint references a link that was never defined.
    #[error("Undefined {role} link '{link}' for joint {joint}")]
    UndefinedLink {
        /// Joint name.
        joint: String,
        /// "parent" or "child".
        role: &'static str,
        /// Referenced link name.
        link: String,
    },
}

impl ParseErrorKind {
    /// Create a missing element error.
    pub fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    /// Create an invalid attribute error.
    pub fn invalid_attribute(
        attribute: &'static str,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute,
            element: element.into(),
            message: message.into(),
        }
    }
}
