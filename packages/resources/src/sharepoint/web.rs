use o365_runtime::{
    ClientContext, ClientObjectCollection, Entity, EntitySchema, KeyStyle, Parameters,
    PropertyDescriptor, ResourcePath, Result,
};

use super::file::File;
use super::folder::{Folder, FOLDER};
use crate::macros::entity;

pub static WEB: EntitySchema = EntitySchema {
    entity_type_name: "SP.Web",
    properties: &[
        PropertyDescriptor::scalar("Id"),
        PropertyDescriptor::scalar("Title"),
        PropertyDescriptor::scalar("Url"),
        PropertyDescriptor::scalar("ServerRelativeUrl"),
        PropertyDescriptor::entity("RootFolder", &FOLDER),
        PropertyDescriptor::entity_collection("Folders", &FOLDER),
    ],
    key_property: None,
    key_style: KeyStyle::Segment,
};

entity! {
    /// A SharePoint site, the entry point for its folders and files.
    Web => WEB
}

impl Web {
    /// The site the context's service root points at.
    pub fn current(context: &ClientContext) -> Self {
        Self::at(context, ResourcePath::root("web"))
    }

    pub fn title(&self) -> Result<Option<String>> {
        self.0.get_scalar("Title")
    }

    pub fn set_title(&self, title: &str) -> Result<&Self> {
        self.0.set_property("Title", title)?;
        Ok(self)
    }

    pub fn url(&self) -> Result<Option<String>> {
        self.0.get_scalar("Url")
    }

    pub fn root_folder(&self) -> Result<Folder> {
        self.0.get_object("RootFolder")
    }

    pub fn folders(&self) -> Result<ClientObjectCollection<Folder>> {
        self.0.get_collection("Folders")
    }

    pub fn get_folder_by_server_relative_url(&self, url: &str) -> Result<Folder> {
        Ok(Folder::at(
            self.0.context(),
            self.operation_path("GetFolderByServerRelativeUrl", url)?,
        ))
    }

    pub fn get_file_by_server_relative_url(&self, url: &str) -> Result<File> {
        Ok(File::at(
            self.0.context(),
            self.operation_path("GetFileByServerRelativeUrl", url)?,
        ))
    }

    fn operation_path(&self, name: &str, url: &str) -> Result<ResourcePath> {
        let path = self
            .0
            .resource_path()
            .ok_or_else(|| o365_runtime::Error::NotAddressable {
                entity_type: WEB.entity_type_name.to_string(),
            })?;
        Ok(path.operation(name, Some(Parameters::positional([url]))))
    }
}
