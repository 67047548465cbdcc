//! Typed resources for the o365 runtime.
//!
//! Each resource is a static [`EntitySchema`](o365_runtime::EntitySchema)
//! plus a thin wrapper over [`ClientObject`](o365_runtime::ClientObject)
//! with typed accessors. Wrappers hold no state of their own; every
//! read, write and action goes through the runtime.
//!
//! ```no_run
//! use o365_resources::sharepoint::Web;
//! use o365_runtime::{ClientContext, ContextConfig};
//!
//! let context = ClientContext::connect(
//!     ContextConfig::new("https://contoso.sharepoint.com/sites/docs/_api")
//!         .with_access_token("token"),
//! )?;
//! let files = Web::current(&context).root_folder()?.files()?;
//! let file = files.add("a.txt", b"hello".to_vec(), false);
//! context.execute_query()?;
//! println!("{:?}", file.server_relative_url()?);
//! # Ok::<(), o365_runtime::Error>(())
//! ```

pub mod directory;
mod macros;
pub mod outlook;
pub mod sharepoint;
#[cfg(test)]
mod testing;

pub use directory::{Extension, ProfilePhoto};
pub use outlook::{my_contacts, Contact, EmailAddress, PhysicalAddress};
pub use sharepoint::{
    CheckinType, File, FileCollection, FileCreationInformation, Folder, RankingLabeling,
    TemplateFileType, Web,
};
