//! Class and annotation descriptions handed to the core by resolvers.

use std::{fmt, sync::Arc};

/// Byte-level description of a host class, as returned by a
/// [`ClassResolver`](super::ClassResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Binary name, `/`-separated (`com/example/Blur`)
    pub binary_name: String,
    /// Binary name of the superclass, `None` for the root class
    pub super_name: Option<String>,
    /// Binary names of directly implemented interfaces
    pub interfaces: Vec<String>,
    /// Raw class file bytes, opaque to the core
    pub bytes: Arc<[u8]>,
}

impl ClassDescriptor {
    /// Creates a descriptor without interfaces or class bytes.
    #[must_use]
    pub fn new(binary_name: impl Into<String>, super_name: Option<&str>) -> Self {
        Self {
            binary_name: binary_name.into(),
            super_name: super_name.map(str::to_string),
            interfaces: Vec::new(),
            bytes: Arc::from(Vec::new()),
        }
    }
}

/// An annotation the core understands. Anything else is carried as
/// [`Annotation::Marker`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Compute work-group size, on the entry method.
    LocalSize {
        /// Invocations along x
        x: u32,
        /// Invocations along y
        y: u32,
        /// Invocations along z
        z: u32,
    },
    /// Binding index of a buffer or uniform, on a field or parameter.
    Binding(u32),
    /// Any other annotation, by binary name.
    Marker(String),
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::LocalSize { x, y, z } => write!(f, "@LocalSize({x}, {y}, {z})"),
            Annotation::Binding(index) => write!(f, "@Binding({index})"),
            Annotation::Marker(name) => write!(f, "@{name}"),
        }
    }
}
