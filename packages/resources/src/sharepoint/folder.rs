use o365_runtime::{ClientObjectCollection, EntitySchema, KeyStyle, PropertyDescriptor, Result};

use super::file::{File, FILE};
use super::file_collection::FileCollection;
use crate::macros::entity;

pub static FOLDER: EntitySchema = EntitySchema {
    entity_type_name: "SP.Folder",
    properties: &[
        PropertyDescriptor::scalar("Name"),
        PropertyDescriptor::scalar("ServerRelativeUrl"),
        PropertyDescriptor::scalar("ItemCount"),
        PropertyDescriptor::scalar("UniqueId"),
        PropertyDescriptor::scalar("Exists"),
        PropertyDescriptor::entity_collection("Files", &FILE),
        PropertyDescriptor::entity_collection("Folders", &FOLDER),
    ],
    key_property: Some("ServerRelativeUrl"),
    key_style: KeyStyle::Operation("GetByUrl"),
};

entity! {
    Folder => FOLDER
}

impl Folder {
    pub fn name(&self) -> Result<Option<String>> {
        self.0.get_scalar("Name")
    }

    pub fn server_relative_url(&self) -> Result<Option<String>> {
        self.0.get_scalar("ServerRelativeUrl")
    }

    pub fn item_count(&self) -> Result<Option<u64>> {
        self.0.get_scalar("ItemCount")
    }

    pub fn files(&self) -> Result<FileCollection> {
        Ok(self.0.get_collection::<File>("Files")?.into())
    }

    pub fn folders(&self) -> Result<ClientObjectCollection<Folder>> {
        self.0.get_collection("Folders")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sharepoint as context, sharepoint_verbose};
    use o365_runtime::{Entity, MockExecutor, ResourcePath};
    use serde_json::json;

    #[test]
    fn nested_collections_hang_off_the_folder() {
        let ctx = context(&MockExecutor::new());
        let folder = Folder::at(&ctx, ResourcePath::root("web").property("RootFolder"));

        assert_eq!(
            folder.files().unwrap().resource_path().unwrap().to_string(),
            "web/RootFolder/Files"
        );
        let sub = folder.folders().unwrap().get_by_url("Shared Documents");
        assert_eq!(
            sub.object().resource_path().unwrap().to_string(),
            "web/RootFolder/Folders/GetByUrl('Shared Documents')"
        );
        assert!(folder.files().unwrap().raw().ptr_eq(folder.files().unwrap().raw()));
    }

    #[test]
    fn expanded_files_bind_into_the_collection() {
        let mock = MockExecutor::new();
        mock.push_response(MockExecutor::success_response(json!({
            "d": {
                "__metadata": {"type": "SP.Folder"},
                "Name": "Shared Documents",
                "ServerRelativeUrl": "/sites/docs/Shared Documents",
                "ItemCount": 1,
                "Files": {"results": [
                    {"Name": "a.txt", "ServerRelativeUrl": "/sites/docs/Shared Documents/a.txt"}
                ]},
                "Folders": {"__deferred": {"uri": "https://contoso/_api/Folders"}}
            }
        })));
        let ctx = sharepoint_verbose(&mock);

        let folder = Folder::at(&ctx, ResourcePath::root("web").property("RootFolder"));
        folder.object().load_with(&[], &["Files"]).execute_query().unwrap();

        assert_eq!(folder.item_count().unwrap(), Some(1));
        let files = folder.files().unwrap().items().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name().unwrap().as_deref(), Some("a.txt"));
        assert!(!folder.folders().unwrap().is_loaded());
    }
}
