//! SharePoint sites, folders, files and search.

mod file;
mod file_collection;
mod folder;
mod search;
mod web;

pub use file::{CheckinType, File, FILE};
pub use file_collection::{FileCollection, FileCreationInformation, TemplateFileType};
pub use folder::{Folder, FOLDER};
pub use search::{RankingLabeling, RANKING_LABELING};
pub use web::{Web, WEB};
