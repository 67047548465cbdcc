use std::ops::Deref;
use std::path::Path;

use o365_runtime::{
    ClientContext, ClientObjectCollection, Entity, Error, Parameters, ProgressCallback,
    ResourcePath, Result, ReturnType, ServiceOperationQuery, UploadOperations, UploadSession,
};
use tracing::debug;

use super::file::File;

/// Parameters of a file `add` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCreationInformation {
    pub url: String,
    pub overwrite: bool,
}

impl FileCreationInformation {
    pub fn new(url: impl Into<String>, overwrite: bool) -> Self {
        Self {
            url: url.into(),
            overwrite,
        }
    }

    pub fn to_parameters(&self) -> Parameters {
        Parameters::new()
            .with("url", self.url.as_str())
            .with("overwrite", self.overwrite)
    }
}

/// Page template used by `addTemplateFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFileType {
    StandardPage = 0,
    WikiPage = 1,
    FormPage = 2,
    ClientSidePage = 3,
}

/// The files of a folder or library.
#[derive(Debug, Clone)]
pub struct FileCollection(ClientObjectCollection<File>);

impl Deref for FileCollection {
    type Target = ClientObjectCollection<File>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ClientObjectCollection<File>> for FileCollection {
    fn from(files: ClientObjectCollection<File>) -> Self {
        Self(files)
    }
}

impl FileCollection {
    pub fn at(context: &ClientContext, path: ResourcePath) -> Self {
        Self(ClientObjectCollection::at(context, path))
    }

    pub fn into_inner(self) -> ClientObjectCollection<File> {
        self.0
    }

    /// Queue `add(url, overwrite)` with `content` as the request body.
    ///
    /// The returned file is a member of this collection and receives the
    /// server's properties when the query binds.
    pub fn add(&self, url: &str, content: impl Into<Vec<u8>>, overwrite: bool) -> File {
        let file = File::new(self.context());
        self.0.add_child(&file);
        let query = ServiceOperationQuery::new(self.0.raw(), "add")
            .with_parameters(FileCreationInformation::new(url, overwrite).to_parameters())
            .with_binary_payload(content)
            .returning(ReturnType::Object(file.object().clone()));
        self.context().add_query(query.into());
        file
    }

    /// Add or replace `name`.
    pub fn upload(&self, name: &str, content: impl Into<Vec<u8>>) -> File {
        self.add(name, content, true)
    }

    pub fn add_template_file(&self, url_of_file: &str, template: TemplateFileType) -> File {
        let file = File::new(self.context());
        self.0.add_child(&file);
        let parameters = Parameters::new()
            .with("urlOfFile", url_of_file)
            .with("templateFileType", template as i32);
        let query = ServiceOperationQuery::new(self.0.raw(), "addTemplateFile")
            .with_parameters(parameters)
            .returning(ReturnType::Object(file.object().clone()));
        self.context().add_query(query.into());
        file
    }

    /// A file addressed by `getById('{id}')`.
    pub fn get_by_id(&self, id: &str) -> File {
        self.0
            .get_by_operation("getById", Parameters::positional([id]))
    }

    /// Upload `content` as `name`, in chunks of at most `chunk_size` bytes.
    ///
    /// Content that fits in one chunk is sent with a single `add`.
    /// Larger content creates an empty file and then streams the bytes
    /// through a start/continue/finish upload session; `progress` is
    /// called with the number of bytes sent after each chunk.
    pub fn upload_chunked(
        &self,
        name: &str,
        content: &[u8],
        chunk_size: u64,
        progress: Option<ProgressCallback>,
    ) -> Result<File> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        let total = content.len() as u64;
        if total <= chunk_size {
            debug!(name, total, "content fits in one chunk; adding directly");
            return Ok(self.add(name, content, true));
        }

        let mut session = UploadSession::new(total, chunk_size, UploadOperations::SHAREPOINT)?;
        if let Some(progress) = progress {
            session = session.with_progress(progress);
        }
        debug!(
            name,
            total,
            chunks = session.ranges().len(),
            upload_id = %session.upload_id(),
            "queueing chunked upload"
        );
        let file = self.add(name, Vec::new(), true);
        session.enqueue(file.object(), content)?;
        Ok(file)
    }

    /// [`upload_chunked`](Self::upload_chunked) with the context's
    /// configured `upload_chunk_size`.
    pub fn upload_large(
        &self,
        name: &str,
        content: &[u8],
        progress: Option<ProgressCallback>,
    ) -> Result<File> {
        let chunk_size = self.context().config().upload_chunk_size;
        self.upload_chunked(name, content, chunk_size, progress)
    }

    /// Chunked upload of the local file at `source_path`, named after
    /// its last path component.
    pub fn create_upload_session(
        &self,
        source_path: impl AsRef<Path>,
        chunk_size: u64,
        progress: Option<ProgressCallback>,
    ) -> Result<File> {
        let source_path = source_path.as_ref();
        let name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::MalformedProperty {
                property: "source_path".to_string(),
                message: format!("{} has no file name", source_path.display()),
            })?;
        let content = std::fs::read(source_path)?;
        self.upload_chunked(name, &content, chunk_size, progress)
    }
}
