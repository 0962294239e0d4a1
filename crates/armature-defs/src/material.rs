//! Materials and the scoped prototype stack.
//!
//! A [`MaterialPrototype`] describes a material statistically (mean and
//! standard deviation of each contact coefficient). Instantiating it draws a
//! concrete [`MaterialInstance`] once, so two bodies built from the same
//! prototype get slightly different coefficients.
//!
//! Unset values are represented by `NaN` throughout, matching the `NaN` token
//! accepted in definition documents.

use std::collections::HashMap;

use rand::Rng;
use rand_distr::StandardNormal;

/// Value assigned to every field of a material defined for the first time.
pub const DEFAULT_COEFFICIENT: f64 = 0.5;

/// Contact coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialProperties {
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Contact stiffness.
    pub stiffness: f64,
    /// Contact dampening.
    pub dampening: f64,
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self::unset()
    }
}

impl MaterialProperties {
    /// All coefficients unset.
    pub const fn unset() -> Self {
        Self {
            friction: f64::NAN,
            stiffness: f64::NAN,
            dampening: f64::NAN,
        }
    }

    /// Create properties from explicit values.
    pub const fn new(friction: f64, stiffness: f64, dampening: f64) -> Self {
        Self {
            friction,
            stiffness,
            dampening,
        }
    }

    /// Whether the coefficients needed for simulation are present.
    ///
    /// Stiffness is not consulted by the physics bridge.
    pub fn is_set(&self) -> bool {
        !self.friction.is_nan() && !self.dampening.is_nan()
    }

    fn inherit(self, base: Self) -> Self {
        Self {
            friction: or_inherit(self.friction, base.friction),
            stiffness: or_inherit(self.stiffness, base.stiffness),
            dampening: or_inherit(self.dampening, base.dampening),
        }
    }

    fn filled(value: f64) -> Self {
        Self::new(value, value, value)
    }
}

/// Visual colour, RGBA in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialColour {
    /// Red.
    pub red: f64,
    /// Green.
    pub green: f64,
    /// Blue.
    pub blue: f64,
    /// Alpha.
    pub alpha: f64,
}

impl Default for MaterialColour {
    fn default() -> Self {
        Self::unset()
    }
}

impl MaterialColour {
    /// All channels unset.
    pub const fn unset() -> Self {
        Self {
            red: f64::NAN,
            green: f64::NAN,
            blue: f64::NAN,
            alpha: f64::NAN,
        }
    }

    /// Create a colour from channel values.
    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Channels as an array.
    pub fn to_array(self) -> [f64; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    fn inherit(self, base: Self) -> Self {
        Self {
            red: or_inherit(self.red, base.red),
            green: or_inherit(self.green, base.green),
            blue: or_inherit(self.blue, base.blue),
            alpha: or_inherit(self.alpha, base.alpha),
        }
    }
}

/// A parameterised material description.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialPrototype {
    /// Mean contact coefficients.
    pub mean: MaterialProperties,
    /// Standard deviation of each coefficient.
    pub std_dev: MaterialProperties,
    /// Colour, never randomised.
    pub colour: MaterialColour,
}

impl MaterialPrototype {
    /// Draw a concrete instance, perturbing each coefficient independently
    /// with zero-mean Gaussian noise of the prototype's standard deviation.
    pub fn instantiate<R: Rng + ?Sized>(&self, rng: &mut R) -> MaterialInstance {
        MaterialInstance {
            properties: MaterialProperties {
                friction: self.mean.friction + gaussian(rng, self.std_dev.friction),
                stiffness: self.mean.stiffness + gaussian(rng, self.std_dev.stiffness),
                dampening: self.mean.dampening + gaussian(rng, self.std_dev.dampening),
            },
            colour: self.colour,
        }
    }

    fn inherit(self, base: &Self) -> Self {
        Self {
            mean: self.mean.inherit(base.mean),
            std_dev: self.std_dev.inherit(base.std_dev),
            colour: self.colour.inherit(base.colour),
        }
    }

    fn with_defaults(self) -> Self {
        let defaults = Self {
            mean: MaterialProperties::filled(DEFAULT_COEFFICIENT),
            std_dev: MaterialProperties::filled(0.0),
            colour: MaterialColour::new(
                DEFAULT_COEFFICIENT,
                DEFAULT_COEFFICIENT,
                DEFAULT_COEFFICIENT,
                DEFAULT_COEFFICIENT,
            ),
        };
        self.inherit(&defaults)
    }
}

/// A concrete material, fixed once drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialInstance {
    /// Contact coefficients.
    pub properties: MaterialProperties,
    /// Colour.
    pub colour: MaterialColour,
}

/// Scoped name to prototype mappings. The innermost scope is the most
/// recently pushed one and shadows the outer scopes.
#[derive(Debug, Clone)]
pub struct MaterialPrototypeStack {
    scopes: Vec<HashMap<String, MaterialPrototype>>,
}

impl Default for MaterialPrototypeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialPrototypeStack {
    /// Create a stack holding one empty scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Open a new innermost scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope. The outermost scope is never removed.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Nearest definition of `name`, searching from the innermost scope out.
    pub fn material_definition(&self, name: &str) -> Option<&MaterialPrototype> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Draw a fresh instance of the nearest definition of `name`.
    pub fn material_instance<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Option<MaterialInstance> {
        self.material_definition(name)
            .map(|prototype| prototype.instantiate(rng))
    }

    /// Define `name` in the innermost scope.
    ///
    /// Unset fields inherit from the nearest existing definition; when there
    /// is none they take the hard-coded defaults (coefficients and colour 0.5,
    /// standard deviations 0).
    pub fn set_material(&mut self, name: impl Into<String>, prototype: MaterialPrototype) {
        let name = name.into();
        let resolved = match self.material_definition(&name) {
            Some(existing) => prototype.inherit(existing),
            None => prototype.with_defaults(),
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, resolved);
        }
    }
}

fn or_inherit(value: f64, base: f64) -> f64 {
    if value.is_nan() {
        base
    } else {
        value
    }
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        let sample: f64 = rng.sample(StandardNormal);
        sample * std_dev
    } else {
        0.0
    }
}
