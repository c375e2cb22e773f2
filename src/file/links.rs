use derive_more::Display;
use log::debug;

use crate::{
    data_type::ArrayValues,
    node::{AttributeMetadata, NodeMetadata, NodePath},
};

use super::{navigation::lookup_child, File, NexusError};

/// The URL scheme of external links.
const EXTERNAL_SCHEME: &str = "nxfile://";

/// The attribute naming the canonical path of a linked entity.
pub(super) const TARGET_ATTRIBUTE: &str = "target";

/// The kind of entity a [`LinkId`] identifies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum LinkKind {
    /// A group.
    #[display("group")]
    Group,
    /// A dataset.
    #[display("dataset")]
    Data,
}

/// The identity of a group or dataset.
///
/// Two ids are equal if and only if they identify the same entity, however it was reached.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
#[display("{kind} {target} in {container}")]
pub struct LinkId {
    /// The identifier of the container of the entity.
    pub container: String,
    /// The path of the entity in its container, with links resolved.
    pub target: NodePath,
    /// The kind of entity.
    pub kind: LinkKind,
}

/// Split an external link URL `nxfile://<target>#<path>` into the container target and the group path.
///
/// A URL without a `#<path>` fragment points to the root group.
pub(super) fn parse_external_url(url: &str) -> Result<(String, NodePath), NexusError> {
    let invalid = || NexusError::InvalidMetadata(format!("invalid external link {url}"));
    let location = url.strip_prefix(EXTERNAL_SCHEME).ok_or_else(invalid)?;
    let (target, path) = location.split_once('#').unwrap_or((location, "/"));
    if target.is_empty() {
        return Err(invalid());
    }
    let path = if path.starts_with('/') {
        NodePath::new(path)
    } else {
        NodePath::new(&format!("/{path}"))
    }
    .map_err(|_| invalid())?;
    Ok((target.to_string(), path))
}

impl File {
    /// Return the id of the open dataset.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if no dataset is open.
    pub fn get_data_id(&self) -> Result<LinkId, NexusError> {
        let data = self.open_data_ref()?;
        Ok(LinkId {
            container: self.chain.top().backend.identifier().to_string(),
            target: data.path.clone(),
            kind: LinkKind::Data,
        })
    }

    /// Return the id of the current group.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidState`] if the file is closed.
    pub fn get_group_id(&self) -> Result<LinkId, NexusError> {
        self.ensure_open()?;
        let top = self.chain.top();
        Ok(LinkId {
            container: top.backend.identifier().to_string(),
            target: top.path.clone(),
            kind: LinkKind::Group,
        })
    }

    /// Returns true if `a` and `b` identify the same entity.
    #[must_use]
    pub fn same_id(&self, a: &LinkId, b: &LinkId) -> bool {
        a == b
    }

    /// Link the entity `id` into the current group under its own name.
    ///
    /// # Errors
    /// See [`File::make_named_link`].
    pub fn make_link(&mut self, id: &LinkId) -> Result<(), NexusError> {
        let name = id.target.name().to_string();
        self.make_named_link(&name, id)
    }

    /// Link the entity `id` into the current group as `name`.
    ///
    /// The entity is shared, not copied. It is given a `target` attribute holding its path unless it has one.
    ///
    /// # Errors
    /// Returns [`NexusError::NameConflict`] if a sibling named `name` exists, [`NexusError::InvalidState`] if a
    /// dataset is open or `id` is in another container, or [`NexusError::NotFound`] if the entity no longer exists.
    pub fn make_named_link(&mut self, name: &str, id: &LinkId) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        let top = self.chain.top();
        if id.container != top.backend.identifier() {
            return Err(NexusError::InvalidState(format!(
                "cannot link {id} into {}",
                top.backend.identifier()
            )));
        }
        let attributes = top.backend.attributes(&id.target)?;
        top.backend.create_link(&top.path.child(name)?, &id.target)?;
        if !attributes.iter().any(|a| a.name == TARGET_ATTRIBUTE) {
            let values = ArrayValues::from(id.target.as_str());
            let shape = vec![values.len() as u64];
            top.backend.put_attribute(
                &id.target,
                AttributeMetadata::new(TARGET_ATTRIBUTE, &values, shape),
            )?;
        }
        debug!("linked {id} as {name}");
        Ok(())
    }

    /// Create an external link `name` of class `nx_class` in the current group.
    ///
    /// `url` has the form `nxfile://<target>#<path>`, where `<target>` is opened with the connector of this file.
    ///
    /// # Errors
    /// Returns [`NexusError::InvalidMetadata`] if `url` is not valid, [`NexusError::NameConflict`] if a sibling named
    /// `name` exists, or [`NexusError::InvalidState`] if a dataset is open.
    pub fn link_external(&mut self, name: &str, nx_class: &str, url: &str) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        parse_external_url(url)?;
        let top = self.chain.top();
        top.backend
            .create_external(&top.path.child(name)?, nx_class, url)
    }

    /// Return the URL of the child `name` of the current group if it is an external group of class `nx_class`.
    ///
    /// An empty `nx_class` matches any class.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if there is no child `name`.
    pub fn is_external_group(&self, name: &str, nx_class: &str) -> Result<Option<String>, NexusError> {
        self.ensure_open()?;
        let top = self.chain.top();
        match lookup_child(&*top.backend, &top.path, name)? {
            Some((_, NodeMetadata::External(external)))
                if nx_class.is_empty() || external.nx_class == nx_class =>
            {
                Ok(Some(external.url))
            }
            Some(_) => Ok(None),
            None => Err(NexusError::NotFound(name.to_string())),
        }
    }

    /// Open the group named by the `target` attribute of the current group.
    ///
    /// # Errors
    /// Returns [`NexusError::NotFound`] if the current group has no `target` attribute or the target does not exist.
    pub fn open_source_group(&mut self) -> Result<(), NexusError> {
        self.ensure_no_data()?;
        let top = self.chain.top();
        let target = top
            .backend
            .attributes(&top.path)?
            .into_iter()
            .find(|attribute| attribute.name == TARGET_ATTRIBUTE)
            .ok_or_else(|| NexusError::NotFound(format!("{TARGET_ATTRIBUTE} attribute of {}", top.path)))?
            .values()?
            .as_text()
            .ok_or_else(|| NexusError::TypeMismatch(format!("{TARGET_ATTRIBUTE} attribute is not text")))?;
        self.open_group_path(&target)
    }
}
