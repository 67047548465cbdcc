use o365_runtime::{
    EntitySchema, KeyStyle, Parameters, PropertyDescriptor, Result, ServiceOperationQuery,
};
use serde_json::Value;
use uuid::Uuid;

use crate::macros::entity;

pub static FILE: EntitySchema = EntitySchema {
    entity_type_name: "SP.File",
    properties: &[
        PropertyDescriptor::scalar("Name"),
        PropertyDescriptor::scalar("ServerRelativeUrl"),
        PropertyDescriptor::scalar("Length"),
        PropertyDescriptor::scalar("UniqueId"),
        PropertyDescriptor::scalar("Title"),
        PropertyDescriptor::scalar("CheckInComment"),
        PropertyDescriptor::scalar("CheckOutType"),
        PropertyDescriptor::scalar("MajorVersion"),
        PropertyDescriptor::scalar("MinorVersion"),
        PropertyDescriptor::scalar("TimeCreated"),
        PropertyDescriptor::scalar("TimeLastModified"),
    ],
    key_property: Some("ServerRelativeUrl"),
    key_style: KeyStyle::Operation("GetByUrl"),
};

entity! {
    /// A document stored in a SharePoint library or folder.
    File => FILE
}

/// How a checked-out file is checked back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinType {
    Minor = 0,
    Major = 1,
    Overwrite = 2,
}

impl File {
    pub fn name(&self) -> Result<Option<String>> {
        self.0.get_scalar("Name")
    }

    pub fn server_relative_url(&self) -> Result<Option<String>> {
        self.0.get_scalar("ServerRelativeUrl")
    }

    pub fn unique_id(&self) -> Result<Option<String>> {
        self.0.get_scalar("UniqueId")
    }

    pub fn title(&self) -> Result<Option<String>> {
        self.0.get_scalar("Title")
    }

    /// Size in bytes. Verbose responses send it as a string.
    pub fn length(&self) -> Result<Option<u64>> {
        match self.0.get_scalar::<Value>("Length")? {
            Some(Value::String(s)) => s.parse().map(Some).map_err(|_| {
                o365_runtime::Error::MalformedProperty {
                    property: "Length".to_string(),
                    message: format!("not a byte count: {:?}", s),
                }
            }),
            Some(other) => Ok(serde_json::from_value(other)?),
            None => Ok(None),
        }
    }

    pub fn check_out(&self) -> &Self {
        self.queue(ServiceOperationQuery::new(&self.0, "CheckOut"));
        self
    }

    pub fn check_in(&self, comment: &str, checkin_type: CheckinType) -> &Self {
        let parameters = Parameters::new()
            .with("comment", comment)
            .with("checkInType", checkin_type as i32);
        self.queue(ServiceOperationQuery::new(&self.0, "CheckIn").with_parameters(parameters));
        self
    }

    pub fn undo_check_out(&self) -> &Self {
        self.queue(ServiceOperationQuery::new(&self.0, "UndoCheckOut"));
        self
    }

    /// Abort a chunked upload and discard the bytes sent so far.
    pub fn cancel_upload(&self, upload_id: Uuid) -> &Self {
        let parameters = Parameters::new().with_guid("uploadId", upload_id);
        self.queue(ServiceOperationQuery::new(&self.0, "CancelUpload").with_parameters(parameters));
        self
    }

    fn queue(&self, query: ServiceOperationQuery) {
        self.0.context().add_query(query.into());
    }
}
