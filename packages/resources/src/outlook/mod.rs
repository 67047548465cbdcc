//! Outlook contacts.

mod contact;
mod values;

pub use contact::{my_contacts, Contact, CONTACT};
pub use values::{EmailAddress, PhysicalAddress};
