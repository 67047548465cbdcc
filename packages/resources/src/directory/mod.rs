//! Directory objects shared by Outlook resources.

use o365_runtime::{EntitySchema, KeyStyle, PropertyDescriptor, Result};

use crate::macros::entity;

pub static EXTENSION: EntitySchema = EntitySchema {
    entity_type_name: "microsoft.graph.extension",
    properties: &[
        PropertyDescriptor::scalar("id"),
        PropertyDescriptor::scalar("extensionName"),
    ],
    key_property: Some("id"),
    key_style: KeyStyle::Segment,
};

pub static PROFILE_PHOTO: EntitySchema = EntitySchema {
    entity_type_name: "microsoft.graph.profilePhoto",
    properties: &[
        PropertyDescriptor::scalar("id"),
        PropertyDescriptor::scalar("height"),
        PropertyDescriptor::scalar("width"),
    ],
    key_property: Some("id"),
    key_style: KeyStyle::Segment,
};

entity! {
    /// An open extension: custom data attached to a resource.
    Extension => EXTENSION
}

impl Extension {
    pub fn id(&self) -> Result<Option<String>> {
        self.0.get_scalar("id")
    }

    pub fn extension_name(&self) -> Result<Option<String>> {
        self.0.get_scalar("extensionName")
    }

    pub fn set_extension_name(&self, name: &str) -> Result<&Self> {
        self.0.set_property("extensionName", name)?;
        Ok(self)
    }
}

entity! {
    /// A contact or user picture.
    ProfilePhoto => PROFILE_PHOTO
}

impl ProfilePhoto {
    pub fn height(&self) -> Result<Option<u32>> {
        self.0.get_scalar("height")
    }

    pub fn width(&self) -> Result<Option<u32>> {
        self.0.get_scalar("width")
    }
}
