use o365_runtime::{
    ClientContext, ClientObjectCollection, ClientValueCollection, EntitySchema, KeyStyle,
    PropertyDescriptor, ResourcePath, Result,
};

use super::values::{EmailAddress, PhysicalAddress};
use crate::directory::{Extension, ProfilePhoto, EXTENSION, PROFILE_PHOTO};
use crate::macros::entity;

pub static CONTACT: EntitySchema = EntitySchema {
    entity_type_name: "microsoft.graph.contact",
    properties: &[
        PropertyDescriptor::scalar("id"),
        PropertyDescriptor::scalar("changeKey"),
        PropertyDescriptor::value_collection("categories"),
        PropertyDescriptor::scalar("createdDateTime"),
        PropertyDescriptor::scalar("lastModifiedDateTime"),
        PropertyDescriptor::scalar("displayName"),
        PropertyDescriptor::scalar("givenName"),
        PropertyDescriptor::scalar("surname"),
        PropertyDescriptor::scalar("manager"),
        PropertyDescriptor::scalar("mobilePhone"),
        PropertyDescriptor::value_collection("businessPhones"),
        PropertyDescriptor::value("homeAddress"),
        PropertyDescriptor::value("businessAddress"),
        PropertyDescriptor::value_collection("emailAddresses"),
        PropertyDescriptor::entity_collection("extensions", &EXTENSION),
        PropertyDescriptor::entity("photo", &PROFILE_PHOTO),
    ],
    key_property: Some("id"),
    key_style: KeyStyle::Segment,
};

entity! {
    /// A contact in the signed-in user's mailbox.
    Contact => CONTACT
}

/// The signed-in user's contacts, `me/contacts`.
pub fn my_contacts(context: &ClientContext) -> ClientObjectCollection<Contact> {
    ClientObjectCollection::at(context, ResourcePath::root("me").property("contacts"))
}

impl Contact {
    pub fn id(&self) -> Result<Option<String>> {
        self.0.get_scalar("id")
    }

    pub fn display_name(&self) -> Result<Option<String>> {
        self.0.get_scalar("displayName")
    }

    pub fn set_display_name(&self, value: &str) -> Result<&Self> {
        self.0.set_property("displayName", value)?;
        Ok(self)
    }

    pub fn given_name(&self) -> Result<Option<String>> {
        self.0.get_scalar("givenName")
    }

    pub fn set_given_name(&self, value: &str) -> Result<&Self> {
        self.0.set_property("givenName", value)?;
        Ok(self)
    }

    pub fn surname(&self) -> Result<Option<String>> {
        self.0.get_scalar("surname")
    }

    pub fn set_surname(&self, value: &str) -> Result<&Self> {
        self.0.set_property("surname", value)?;
        Ok(self)
    }

    /// Name of the contact's manager.
    pub fn manager(&self) -> Result<Option<String>> {
        self.0.get_scalar("manager")
    }

    pub fn set_manager(&self, value: &str) -> Result<&Self> {
        self.0.set_property("manager", value)?;
        Ok(self)
    }

    pub fn mobile_phone(&self) -> Result<Option<String>> {
        self.0.get_scalar("mobilePhone")
    }

    pub fn set_mobile_phone(&self, value: &str) -> Result<&Self> {
        self.0.set_property("mobilePhone", value)?;
        Ok(self)
    }

    pub fn business_phones(&self) -> Result<Vec<String>> {
        self.0.get_value("businessPhones")
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        self.0.get_value("categories")
    }

    pub fn home_address(&self) -> Result<PhysicalAddress> {
        self.0.get_value("homeAddress")
    }

    pub fn set_home_address(&self, value: &PhysicalAddress) -> Result<&Self> {
        self.0.set_property("homeAddress", value)?;
        Ok(self)
    }

    pub fn business_address(&self) -> Result<PhysicalAddress> {
        self.0.get_value("businessAddress")
    }

    pub fn email_addresses(&self) -> Result<ClientValueCollection<EmailAddress>> {
        self.0.get_value("emailAddresses")
    }

    pub fn set_email_addresses(&self, value: &ClientValueCollection<EmailAddress>) -> Result<&Self> {
        self.0.set_property("emailAddresses", value)?;
        Ok(self)
    }

    /// Open extensions defined for the contact.
    pub fn extensions(&self) -> Result<ClientObjectCollection<Extension>> {
        self.0.get_collection("extensions")
    }

    pub fn photo(&self) -> Result<ProfilePhoto> {
        self.0.get_object("photo")
    }
}
