//! Chunked uploads.
//!
//! A session splits content into ascending, contiguous byte ranges and
//! queues one service operation per range: start, continue..., finish.
//! The session id is generated locally.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::object::ClientObject;
use crate::path::Parameters;
use crate::query::{Query, ReturnType, Sequence, ServiceOperationQuery};

/// Called with the number of bytes sent so far after each chunk binds.
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Split `total` bytes into `[start, end)` ranges of at most `chunk_size`.
pub fn chunk_ranges(total: u64, chunk_size: u64) -> Result<Vec<Range<u64>>> {
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize);
    }
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = start.saturating_add(chunk_size).min(total);
        ranges.push(start..end);
        start = end;
    }
    Ok(ranges)
}

/// Names of the service operations driving a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOperations {
    pub start: &'static str,
    pub resume: &'static str,
    pub finish: &'static str,
    pub upload_id: &'static str,
    pub offset: &'static str,
}

impl UploadOperations {
    pub const SHAREPOINT: UploadOperations = UploadOperations {
        start: "StartUpload",
        resume: "ContinueUpload",
        finish: "FinishUpload",
        upload_id: "uploadId",
        offset: "fileOffset",
    };
}

pub struct UploadSession {
    upload_id: Uuid,
    total: u64,
    ranges: Vec<Range<u64>>,
    operations: UploadOperations,
    progress: Option<ProgressCallback>,
}

impl UploadSession {
    pub fn new(total: u64, chunk_size: u64, operations: UploadOperations) -> Result<Self> {
        Ok(Self {
            upload_id: Uuid::new_v4(),
            total,
            ranges: chunk_ranges(total, chunk_size)?,
            operations,
            progress: None,
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn upload_id(&self) -> Uuid {
        self.upload_id
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }

    /// Queue one query per chunk against `target`, in order. The final
    /// chunk binds the completed resource back into `target`.
    ///
    /// A single-range session sends its only chunk with the start
    /// operation and closes with an empty finish.
    ///
    /// Chunks go out one request at a time, also in batch mode. Once a
    /// chunk fails, the remaining ones fail with [`Error::Aborted`]
    /// without being sent.
    pub fn enqueue(&self, target: &ClientObject, content: &[u8]) -> Result<()> {
        if content.len() as u64 != self.total {
            return Err(Error::MalformedProperty {
                property: "content".to_string(),
                message: format!(
                    "session covers {} bytes, got {}",
                    self.total,
                    content.len()
                ),
            });
        }

        let ops = &self.operations;
        let sequence = Sequence::new(format!("upload session {}", self.upload_id));
        let last = self.ranges.len().saturating_sub(1);
        for (i, range) in self.ranges.iter().enumerate() {
            let chunk = &content[range.start as usize..range.end as usize];
            let mut parameters = Parameters::new().with_guid(ops.upload_id, self.upload_id);
            let name = if i == 0 {
                ops.start
            } else {
                parameters = parameters.with(ops.offset, range.start);
                if i == last {
                    ops.finish
                } else {
                    ops.resume
                }
            };

            let mut query = ServiceOperationQuery::new(target, name)
                .with_parameters(parameters)
                .with_binary_payload(chunk.to_vec());
            if i == last && last > 0 {
                query = query.returning(ReturnType::Object(target.clone()));
            }
            self.queue(target, &sequence, query, range.end);
        }

        if self.ranges.len() == 1 {
            let query = ServiceOperationQuery::new(target, ops.finish)
                .with_parameters(
                    Parameters::new()
                        .with_guid(ops.upload_id, self.upload_id)
                        .with(ops.offset, self.total),
                )
                .with_binary_payload(Vec::new())
                .returning(ReturnType::Object(target.clone()));
            self.queue(target, &sequence, query, self.total);
        }
        Ok(())
    }

    fn queue(
        &self,
        target: &ClientObject,
        sequence: &Arc<Sequence>,
        query: ServiceOperationQuery,
        sent: u64,
    ) {
        let mut query = Query::from(query).in_sequence(sequence);
        if let Some(progress) = &self.progress {
            let progress = Arc::clone(progress);
            query = query.on_resolved(move || progress(sent));
        }
        target.context().add_query(query);
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("upload_id", &self.upload_id)
            .field("total", &self.total)
            .field("chunks", &self.ranges.len())
            .finish()
    }
}
