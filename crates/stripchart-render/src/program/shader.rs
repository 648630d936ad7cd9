use std::collections::HashMap;

use crate::backend::{
    ProgramId, ProgramSource, RenderBackend, UniformLocation, UniformValue, VertexLayout,
};
use crate::error::ShaderError;

use super::ProgramInterface;

#[derive(Debug, Clone, Copy, PartialEq)]
struct DeclaredAttribute {
    location: u32,
    layout: VertexLayout,
}

/// A linked program plus the vertex layout its callers feed it.
///
/// The program owns no buffers. Whatever buffer is bound when
/// [`activate`](Self::activate) runs is the one read through the declared
/// attributes.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    interface: ProgramInterface,
    attributes: Vec<DeclaredAttribute>,
    uniform_cache: HashMap<String, Option<UniformLocation>>,
}

impl ShaderProgram {
    /// Compile and link a program. Failures are logged before being returned.
    pub fn new<B: RenderBackend>(
        backend: &mut B,
        label: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, ShaderError> {
        let linked = ProgramInterface::link(label, vertex, fragment).and_then(|interface| {
            let source = ProgramSource {
                label,
                vertex,
                fragment,
            };
            let id = backend.create_program(&source, &interface)?;
            Ok((id, interface))
        });

        match linked {
            Ok((id, interface)) => {
                log::debug!("Linked program {label} ({id:?})");
                Ok(Self {
                    id,
                    label: label.to_string(),
                    interface,
                    attributes: Vec::new(),
                    uniform_cache: HashMap::new(),
                })
            }
            Err(e) => {
                log::error!("{e}");
                Err(e)
            }
        }
    }

    /// Declare how attribute `name` is read from the bound buffer.
    ///
    /// Offset and stride are in bytes. Declaring the same name again replaces
    /// the earlier layout.
    pub fn attribute(
        &mut self,
        name: &str,
        components: u32,
        offset: u32,
        stride: u32,
    ) -> Result<(), ShaderError> {
        let info = self
            .interface
            .attribute(name)
            .ok_or_else(|| ShaderError::UnknownAttribute {
                label: self.label.clone(),
                name: name.to_string(),
            })?;
        if info.components != components {
            log::warn!(
                "{}: attribute `{name}` declared with {components} components, shader reads {}",
                self.label,
                info.components
            );
        }

        let declared = DeclaredAttribute {
            location: info.location,
            layout: VertexLayout::new(components, offset, stride),
        };
        match self
            .attributes
            .iter_mut()
            .find(|a| a.location == info.location)
        {
            Some(existing) => *existing = declared,
            None => self.attributes.push(declared),
        }
        Ok(())
    }

    /// Set a uniform by name on the active program.
    ///
    /// The location is resolved on first use and cached, including misses, so
    /// an unknown name is reported once and then ignored.
    pub fn set_uniform<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        let value = value.into();
        let location = match self.uniform_cache.get(name) {
            Some(cached) => *cached,
            None => {
                let location = self.interface.uniform(name);
                match location {
                    None => log::warn!("{}: no uniform named `{name}`", self.label),
                    Some(loc) if !loc.accepts(&value) => log::warn!(
                        "{}: uniform `{name}` cannot hold a {:?}",
                        self.label,
                        value.kind()
                    ),
                    Some(_) => {}
                }
                self.uniform_cache.insert(name.to_string(), location);
                location
            }
        };

        if let Some(location) = location.filter(|loc| loc.accepts(&value)) {
            backend.set_uniform(location, value);
        }
    }

    /// Select the program and enable every declared attribute against the
    /// currently bound buffer.
    pub fn activate<B: RenderBackend>(&self, backend: &mut B) {
        backend.use_program(Some(self.id));
        for attribute in &self.attributes {
            backend.enable_attribute(attribute.location, attribute.layout);
        }
    }

    /// Disable the declared attributes.
    pub fn deactivate<B: RenderBackend>(&self, backend: &mut B) {
        for attribute in &self.attributes {
            backend.disable_attribute(attribute.location);
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }
}
