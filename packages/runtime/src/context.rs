//! The client context: query queue and execution engine.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use o365_http::{HttpExecutor, HttpRequest, HttpResponse, ReqwestExecutor};
use tracing::{debug, warn};
use url::Url;

use crate::batch;
use crate::config::{ContextConfig, JsonFormat};
use crate::error::{Error, QueryFailure, Result};
use crate::query::{Query, QueryState, RenderSettings};
use crate::response;
use crate::sync::lock;

struct ContextInner {
    config: ContextConfig,
    service_root: Url,
    executor: Arc<dyn HttpExecutor>,
    pending: Mutex<VecDeque<Query>>,
    /// Held for the whole of one flush.
    flush: Mutex<()>,
    /// Thread currently flushing, to detect re-entrant calls.
    flushing: Mutex<Option<ThreadId>>,
}

/// Session handle. Cheap to clone; every proxy created from it shares
/// the same queue and transport.
#[derive(Clone)]
pub struct ClientContext {
    inner: Arc<ContextInner>,
}

/// Clears the flushing thread on exit, including unwinding.
struct FlushingGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

/// Failures collected during one flush.
struct Outcome {
    failures: Vec<QueryFailure>,
}

impl Outcome {
    fn fail(&mut self, index: usize, mut query: Query, error: Error) {
        query.fail(&error);
        query.set_state(QueryState::Failed);
        let description = query.description();
        warn!(index, query = %description, error = %error, "query failed");
        self.failures.push(QueryFailure {
            index,
            description,
            error,
        });
    }

    /// Fail everything left after a transport error.
    fn abort(&mut self, rest: impl IntoIterator<Item = (usize, Query)>, reason: &str) {
        for (index, query) in rest {
            self.fail(
                index,
                query,
                Error::Aborted {
                    reason: reason.to_string(),
                },
            );
        }
    }

    fn complete(&mut self, index: usize, mut query: Query, response: &HttpResponse, format: JsonFormat) {
        if !response.is_success() {
            let remote = response::remote_error(response);
            self.fail(index, query, Error::Remote(remote));
            return;
        }
        match query.bind(response, format) {
            Ok(()) => query.set_state(QueryState::Resolved),
            Err(error) => self.fail(index, query, error),
        }
    }
}

impl ClientContext {
    pub fn new(config: ContextConfig, executor: Arc<dyn HttpExecutor>) -> Result<Self> {
        let service_root = config.validate()?;
        Ok(Self {
            inner: Arc::new(ContextInner {
                config,
                service_root,
                executor,
                pending: Mutex::new(VecDeque::new()),
                flush: Mutex::new(()),
                flushing: Mutex::new(None),
            }),
        })
    }

    /// Context backed by the blocking reqwest transport.
    pub fn connect(config: ContextConfig) -> Result<Self> {
        let mut executor = ReqwestExecutor::new(config.timeout())?;
        for (name, value) in &config.default_headers {
            executor = executor.with_default_header(name.clone(), value.clone());
        }
        Self::new(config, Arc::new(executor))
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    pub fn service_root(&self) -> &Url {
        &self.inner.service_root
    }

    pub fn json_format(&self) -> JsonFormat {
        self.inner.config.json_format
    }

    /// Append `query` to the queue. No I/O.
    pub fn add_query(&self, mut query: Query) {
        query.set_state(QueryState::Queued);
        debug!(query = %query.description(), "queued");
        lock(&self.inner.pending).push_back(query);
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Snapshot of the queue in submission order.
    pub fn pending_queries(&self) -> Vec<Query> {
        lock(&self.inner.pending).iter().cloned().collect()
    }

    /// Drop every queued query without sending it.
    pub fn clear_pending(&self) {
        lock(&self.inner.pending).clear();
    }

    pub fn ptr_eq(&self, other: &ClientContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn settings(&self) -> RenderSettings<'_> {
        RenderSettings {
            service_root: &self.inner.service_root,
            format: self.inner.config.json_format,
        }
    }

    /// Flush the queue: send every pending query in submission order and
    /// bind each response into its target.
    ///
    /// Queries added while flushing wait for the next call. Returns
    /// [`Error::Batch`] listing every query that failed.
    pub fn execute_query(&self) -> Result<()> {
        let current = thread::current().id();
        if *lock(&self.inner.flushing) == Some(current) {
            return Err(Error::ExecutionInProgress);
        }
        let _flush = lock(&self.inner.flush);
        *lock(&self.inner.flushing) = Some(current);
        let _flushing = FlushingGuard(&self.inner.flushing);
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let queries = lock(&self.inner.pending).drain(..).collect::<Vec<_>>();
        if queries.is_empty() {
            return Ok(());
        }
        let total = queries.len();
        debug!(total, batched = self.inner.config.batch.enabled, "executing queries");

        let mut outcome = Outcome {
            failures: Vec::new(),
        };
        if self.inner.config.batch.enabled {
            self.run_batched(queries, &mut outcome);
        } else {
            self.run_sequential(queries, &mut outcome);
        }

        if outcome.failures.is_empty() {
            debug!(total, "all queries resolved");
            Ok(())
        } else {
            Err(Error::Batch {
                total,
                failures: outcome.failures,
            })
        }
    }

    fn run_sequential(&self, queries: Vec<Query>, outcome: &mut Outcome) {
        let settings = self.settings();
        let mut queries = queries.into_iter().enumerate();
        while let Some((index, query)) = queries.next() {
            let request = match query.render(&settings) {
                Ok(request) => request,
                Err(error) => {
                    outcome.fail(index, query, error);
                    continue;
                }
            };
            match self.inner.executor.execute(&request) {
                Ok(response) => outcome.complete(index, query, &response, settings.format),
                Err(error) => {
                    let error = Error::from(error);
                    let reason = error.to_string();
                    outcome.fail(index, query, error);
                    outcome.abort(queries.by_ref(), &reason);
                }
            }
        }
    }

    fn run_batched(&self, queries: Vec<Query>, outcome: &mut Outcome) {
        let settings = self.settings();
        let max = self.inner.config.batch.max_batch_size.max(1);
        let mut group: Vec<(usize, Query, HttpRequest)> = Vec::new();
        let mut queries = queries.into_iter().enumerate();

        while let Some((index, query)) = queries.next() {
            // Sequenced queries travel alone, after everything before them is bound.
            let alone = query.is_sequenced();
            if alone && !group.is_empty() {
                if let Err(reason) = self.send_group(std::mem::take(&mut group), outcome) {
                    outcome.abort(std::iter::once((index, query)).chain(queries.by_ref()), &reason);
                    return;
                }
            }

            let request = match query.render(&settings) {
                Ok(request) => request,
                Err(Error::NotAddressable { .. }) if !group.is_empty() => {
                    // Earlier binds in the open group may give it a path.
                    if let Err(reason) = self.send_group(std::mem::take(&mut group), outcome) {
                        outcome.abort(std::iter::once((index, query)).chain(queries.by_ref()), &reason);
                        return;
                    }
                    match query.render(&settings) {
                        Ok(request) => request,
                        Err(error) => {
                            outcome.fail(index, query, error);
                            continue;
                        }
                    }
                }
                Err(error) => {
                    outcome.fail(index, query, error);
                    continue;
                }
            };

            group.push((index, query, request));
            if alone || group.len() >= max {
                if let Err(reason) = self.send_group(std::mem::take(&mut group), outcome) {
                    outcome.abort(queries.by_ref(), &reason);
                    return;
                }
            }
        }

        if !group.is_empty() {
            // Nothing follows the last group, so its abort reason is unused.
            let _ = self.send_group(group, outcome);
        }
    }

    /// Send one group and bind its responses. `Err` carries the reason
    /// when the transport failed and the rest of the flush must abort.
    fn send_group(
        &self,
        group: Vec<(usize, Query, HttpRequest)>,
        outcome: &mut Outcome,
    ) -> std::result::Result<(), String> {
        let format = self.inner.config.json_format;

        if group.len() == 1 {
            if let Some((index, query, request)) = group.into_iter().next() {
                match self.inner.executor.execute(&request) {
                    Ok(response) => outcome.complete(index, query, &response, format),
                    Err(error) => {
                        let error = Error::from(error);
                        let reason = error.to_string();
                        outcome.fail(index, query, error);
                        return Err(reason);
                    }
                }
            }
            return Ok(());
        }

        let requests = group.iter().map(|(_, _, r)| r).collect::<Vec<_>>();
        let envelope = batch::encode(&requests, &self.inner.service_root);
        debug!(size = group.len(), "sending batch");

        let response = match self.inner.executor.execute(&envelope) {
            Ok(response) => response,
            Err(error) => {
                let error = Error::from(error);
                let reason = error.to_string();
                let mut group = group.into_iter();
                if let Some((index, query, _)) = group.next() {
                    outcome.fail(index, query, error);
                }
                outcome.abort(group.map(|(index, query, _)| (index, query)), &reason);
                return Err(reason);
            }
        };

        if !response.is_success() {
            let remote = response::remote_error(&response);
            for (index, query, _) in group {
                outcome.fail(index, query, Error::Remote(remote.clone()));
            }
            return Ok(());
        }

        match batch::decode(&response, group.len()) {
            Ok(responses) => {
                for ((index, query, _), response) in group.into_iter().zip(responses) {
                    outcome.complete(index, query, &response, format);
                }
            }
            Err(error) => {
                for (index, query, _) in group {
                    outcome.fail(index, query, error.clone());
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("service_root", &self.inner.service_root.as_str())
            .field("json_format", &self.inner.config.json_format)
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests;
