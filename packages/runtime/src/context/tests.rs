use std::sync::{Arc, Mutex};

use o365_http::{HttpResponse, Method};
use serde_json::json;

use super::*;
use crate::collection::{ClientObjectCollection, EntityCollection};
use crate::error::ErrorKind;
use crate::object::ClientObject;
use crate::query::{ReadQuery, ServiceOperationQuery};
use crate::result::ClientResult;
use crate::schema::Entity;
use crate::testing::{
    contact_at, context, context_with, path, verbose_context, Contact, CONTACT, FILE, ROOT,
};
use crate::upload::{UploadOperations, UploadSession};
use crate::MockExecutor;

fn ok(body: serde_json::Value) -> HttpResponse {
    HttpResponse::json(200, body)
}

fn no_content() -> HttpResponse {
    HttpResponse::json(204, serde_json::Value::Null)
}

#[test]
fn empty_queue_sends_nothing() {
    let mock = MockExecutor::new();
    let ctx = context(&mock);
    ctx.execute_query().unwrap();
    assert!(mock.recorded_requests().is_empty());
}

#[test]
fn responses_bind_in_submission_order() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"id": "1", "displayName": "one"})))
        .push_response(ok(json!({"id": "2", "displayName": "two"})))
        .push_response(ok(json!({"id": "3", "displayName": "three"})));
    let ctx = context(&mock);

    let contacts = ["1", "2", "3"]
        .iter()
        .map(|id| contact_at(&ctx, &format!("me/contacts/{}", id)))
        .collect::<Vec<_>>();
    for contact in &contacts {
        contact.load();
    }
    ctx.execute_query().unwrap();

    let names = contacts
        .iter()
        .map(|c| c.get_scalar::<String>("displayName").unwrap().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["one", "two", "three"]);

    let urls = mock
        .recorded_requests()
        .into_iter()
        .map(|r| r.path)
        .collect::<Vec<_>>();
    assert_eq!(
        urls,
        vec![
            format!("{}/me/contacts/1", ROOT),
            format!("{}/me/contacts/2", ROOT),
            format!("{}/me/contacts/3", ROOT),
        ]
    );
    assert_eq!(ctx.pending_count(), 0);
}

#[test]
fn remote_failure_is_isolated_to_its_query() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"displayName": "one"})))
        .push_response(MockExecutor::error_response(404, "The item was not found"))
        .push_response(ok(json!({"displayName": "three"})));
    let ctx = context(&mock);

    let first = contact_at(&ctx, "me/contacts/1");
    let second = contact_at(&ctx, "me/contacts/2");
    let third = contact_at(&ctx, "me/contacts/3");
    second.bind_json(&json!({"displayName": "cached"}));
    for contact in [&first, &second, &third] {
        contact.load();
    }

    let err = ctx.execute_query().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteProtocol);
    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].error.as_remote().unwrap().status, 404);

    assert_eq!(
        first.get_scalar::<String>("displayName").unwrap().as_deref(),
        Some("one")
    );
    assert_eq!(
        third.get_scalar::<String>("displayName").unwrap().as_deref(),
        Some("three")
    );
    assert_eq!(
        second.get_scalar::<String>("displayName").unwrap().as_deref(),
        Some("cached")
    );
    assert_eq!(second.last_error().unwrap().message, "The item was not found");
    assert!(first.last_error().is_none());
}

#[test]
fn transport_failure_aborts_the_rest() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"displayName": "one"})))
        .push_failure("connection reset");
    let ctx = context(&mock);

    for id in 1..=3 {
        contact_at(&ctx, &format!("me/contacts/{}", id)).load();
    }
    let err = ctx.execute_query().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    let failures = err.failures();
    assert_eq!(failures.len(), 2);
    assert!(matches!(failures[0].error, Error::Transport(_)));
    assert!(matches!(failures[1].error, Error::Aborted { .. }));
    assert_eq!(failures[1].index, 2);
    assert_eq!(mock.recorded_requests().len(), 2);
}

#[test]
fn update_sends_only_dirty_properties() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({
        "id": "1",
        "displayName": "Ada",
        "mobilePhone": "555-0100",
        "manager": "Charles"
    })))
    .push_response(no_content());
    let ctx = context(&mock);

    let contact = contact_at(&ctx, "me/contacts/1");
    contact.load().execute_query().unwrap();
    assert!(!contact.has_changes());

    contact.set_property("mobilePhone", "555-0199").unwrap();
    contact.update().execute_query().unwrap();

    let requests = mock.recorded_requests();
    let update = &requests[1];
    assert_eq!(update.method, Method::PATCH);
    assert_eq!(update.path, format!("{}/me/contacts/1", ROOT));
    assert_eq!(
        update.body.as_ref().unwrap().as_json().unwrap(),
        &json!({"mobilePhone": "555-0199"})
    );
    assert!(!contact.has_changes());
    assert_eq!(
        contact.get_scalar::<String>("mobilePhone").unwrap().as_deref(),
        Some("555-0199")
    );
}

#[test]
fn edits_after_update_stay_dirty() {
    let mock = MockExecutor::new();
    mock.push_response(no_content());
    let ctx = context(&mock);

    let contact = contact_at(&ctx, "me/contacts/1");
    contact.set_property("mobilePhone", "1").unwrap();
    contact.update();
    contact.set_property("mobilePhone", "2").unwrap();
    ctx.execute_query().unwrap();

    assert_eq!(contact.dirty_properties(), vec!["mobilePhone".to_string()]);
    let sent = mock.recorded_requests()[0].body.clone().unwrap();
    assert_eq!(sent.as_json().unwrap(), &json!({"mobilePhone": "1"}));
}

#[test]
fn verbose_update_tunnels_through_post() {
    let mock = MockExecutor::new();
    mock.push_response(no_content());
    let ctx = verbose_context(&mock);

    let contact = ClientObject::new(&ctx, &CONTACT, Some(path("web/contacts/1")));
    contact.set_property("displayName", "Ada").unwrap();
    contact.update().execute_query().unwrap();

    let request = &mock.recorded_requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.header("X-HTTP-Method"), Some("MERGE"));
    assert_eq!(request.header("If-Match"), Some("*"));
    assert_eq!(request.header("Accept"), Some("application/json;odata=verbose"));
    assert_eq!(
        request.body.as_ref().unwrap().as_json().unwrap(),
        &json!({
            "__metadata": {"type": "microsoft.graph.contact"},
            "displayName": "Ada"
        })
    );
}

#[test]
fn delete_removes_from_parent_collection() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"value": [{"id": "1"}, {"id": "2"}]})))
        .push_response(no_content());
    let ctx = context(&mock);

    let contacts = ClientObjectCollection::<Contact>::at(&ctx, path("me/contacts"));
    contacts.load().execute_query().unwrap();
    let first = contacts.items().unwrap().remove(0);

    first.object().delete_object().execute_query().unwrap();

    let request = &mock.recorded_requests()[1];
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, format!("{}/me/contacts/1", ROOT));
    assert!(first.object().is_deleted());
    assert_eq!(contacts.len().unwrap(), 1);
}

#[test]
fn failed_delete_keeps_membership() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"value": [{"id": "1"}]})))
        .push_response(MockExecutor::error_response(403, "Access denied"));
    let ctx = context(&mock);

    let contacts = ClientObjectCollection::<Contact>::at(&ctx, path("me/contacts"));
    contacts.load().execute_query().unwrap();
    let only = contacts.items().unwrap().remove(0);

    assert!(only.object().delete_object().execute_query().is_err());
    assert!(!only.object().is_deleted());
    assert_eq!(contacts.len().unwrap(), 1);
    assert_eq!(only.object().last_error().unwrap().status, 403);
}

#[test]
fn reentrant_execution_is_rejected() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"id": "1"})));
    let ctx = context(&mock);

    let inner = Arc::new(Mutex::new(None));
    let query = {
        let ctx = ctx.clone();
        let inner = Arc::clone(&inner);
        crate::query::Query::from(ReadQuery::object(contact_at(&ctx, "me/contacts/1")))
            .on_resolved(move || {
                *inner.lock().unwrap() = Some(ctx.execute_query());
            })
    };
    ctx.add_query(query);
    ctx.execute_query().unwrap();

    let observed = inner.lock().unwrap().take().unwrap();
    assert!(matches!(observed, Err(Error::ExecutionInProgress)));
}

#[test]
fn queries_added_while_flushing_wait_for_next_cycle() {
    let mock = MockExecutor::new().with_default_response(ok(json!({"id": "1"})));
    let ctx = context(&mock);

    let follow_up = contact_at(&ctx, "me/contacts/2");
    let query = {
        let follow_up = follow_up.clone();
        crate::query::Query::from(ReadQuery::object(contact_at(&ctx, "me/contacts/1")))
            .on_resolved(move || {
                follow_up.load();
            })
    };
    ctx.add_query(query);

    ctx.execute_query().unwrap();
    assert_eq!(mock.recorded_requests().len(), 1);
    assert_eq!(ctx.pending_count(), 1);

    ctx.execute_query().unwrap();
    assert_eq!(mock.recorded_requests().len(), 2);
}

#[test]
fn collection_requires_a_read_before_iteration() {
    let ctx = context(&MockExecutor::new());
    let contacts = ClientObjectCollection::<Contact>::at(&ctx, path("me/contacts"));
    assert!(matches!(
        contacts.items(),
        Err(Error::CollectionNotLoaded { .. })
    ));
    assert!(matches!(contacts.len(), Err(Error::CollectionNotLoaded { .. })));
}

#[test]
fn paging_follows_next_link() {
    let next = format!("{}/me/contacts?$skip=2", ROOT);
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({
        "value": [{"id": "1"}, {"id": "2"}],
        "@odata.nextLink": next
    })))
    .push_response(ok(json!({"value": [{"id": "3"}]})));
    let ctx = context(&mock);

    let contacts = ClientObjectCollection::<Contact>::at(&ctx, path("me/contacts"));
    contacts.load_top(2).execute_query().unwrap();
    assert_eq!(contacts.len().unwrap(), 2);
    assert_eq!(contacts.next_link().as_deref(), Some(next.as_str()));

    assert!(contacts.load_next_page());
    ctx.execute_query().unwrap();
    assert_eq!(contacts.len().unwrap(), 3);
    assert!(contacts.next_link().is_none());
    assert!(!contacts.load_next_page());

    let requests = mock.recorded_requests();
    assert_eq!(requests[0].query.get("$top").map(String::as_str), Some("2"));
    assert_eq!(requests[1].path, next);
}

#[test]
fn create_binds_server_identity() {
    let mock = MockExecutor::new();
    mock.push_response(HttpResponse::json(
        201,
        json!({"id": "42", "displayName": "Ada"}),
    ));
    let ctx = context(&mock);

    let contacts = ClientObjectCollection::<Contact>::at(&ctx, path("me/contacts"));
    let contact = Contact::new(&ctx);
    contact.object().set_property("displayName", "Ada").unwrap();
    contacts.add(&contact).execute_query().unwrap();

    let request = &mock.recorded_requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, format!("{}/me/contacts", ROOT));
    assert_eq!(
        request.body.as_ref().unwrap().as_json().unwrap(),
        &json!({"displayName": "Ada"})
    );
    assert_eq!(
        contact.object().resource_path().unwrap().to_string(),
        "me/contacts/42"
    );
    assert!(!contact.object().has_changes());
}

#[test]
fn service_operation_result_is_resolved() {
    let mock = MockExecutor::new();
    mock.push_response(ok(json!({"value": "https://contoso/a"})));
    let ctx = context(&mock);

    let target = contact_at(&ctx, "search");
    let result = ClientResult::<String>::new("NormalizeResultUrl");
    ctx.add_query(
        ServiceOperationQuery::new(&target, "NormalizeResultUrl")
            .with_json_payload(json!({"url": "https://contoso/a?x"}))
            .returning(&result)
            .into(),
    );
    assert!(!result.is_resolved());
    ctx.execute_query().unwrap();
    assert_eq!(result.value().unwrap(), "https://contoso/a");

    let request = &mock.recorded_requests()[0];
    assert_eq!(request.path, format!("{}/search/NormalizeResultUrl", ROOT));
}

#[test]
fn unaddressable_query_fails_locally() {
    let mock = MockExecutor::new();
    let ctx = context(&mock);
    ClientObject::new(&ctx, &CONTACT, None).load();

    let err = ctx.execute_query().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LocalUsage);
    assert!(matches!(
        err.failures()[0].error,
        Error::NotAddressable { .. }
    ));
    assert!(mock.recorded_requests().is_empty());
}

fn file_at(ctx: &ClientContext) -> ClientObject {
    ClientObject::new(ctx, &FILE, Some(path("web/files/a.bin")))
}

/// Queue a 10 byte upload in chunks of 4 and return the progress log.
fn queue_upload(file: &ClientObject) -> Arc<Mutex<Vec<u64>>> {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&sent);
    UploadSession::new(10, 4, UploadOperations::SHAREPOINT)
        .unwrap()
        .with_progress(Arc::new(move |bytes: u64| log.lock().unwrap().push(bytes)))
        .enqueue(file, &[7u8; 10])
        .unwrap();
    sent
}

#[test]
fn failed_chunk_stops_the_rest_of_its_session() {
    let mock = MockExecutor::new();
    mock.push_response(MockExecutor::error_response(500, "upload rejected"))
        .push_response(ok(json!({"id": "1", "displayName": "one"})));
    let ctx = context(&mock);

    let file = file_at(&ctx);
    let sent = queue_upload(&file);
    let contact = contact_at(&ctx, "me/contacts/1");
    contact.load();

    let err = ctx.execute_query().unwrap_err();
    let failures = err.failures();
    assert_eq!(failures.len(), 3);
    assert!(matches!(failures[0].error, Error::Remote(_)));
    assert!(matches!(failures[1].error, Error::Aborted { .. }));
    assert!(matches!(failures[2].error, Error::Aborted { .. }));
    assert!(sent.lock().unwrap().is_empty());

    // Only the start chunk went out; unrelated queries still ran.
    let requests = mock.recorded_requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].path.contains("/web/files/a.bin/StartUpload("));
    assert_eq!(requests[1].path, format!("{}/me/contacts/1", ROOT));
    assert_eq!(
        contact.get_scalar::<String>("displayName").unwrap().as_deref(),
        Some("one")
    );
}

mod batched {
    use super::*;

    fn batched_context(mock: &MockExecutor, size: usize) -> ClientContext {
        context_with(mock, ContextConfig::new(ROOT).with_batching(size))
    }

    #[test]
    fn queries_share_one_envelope() {
        let mock = MockExecutor::new();
        mock.push_response(ok(json!({"responses": [
            {"id": "2", "status": 200, "body": {"displayName": "three"}},
            {"id": "0", "status": 200, "body": {"displayName": "one"}},
            {"id": "1", "status": 404, "body": {"error": {"code": "ErrorItemNotFound", "message": "gone"}}}
        ]})));
        let ctx = batched_context(&mock, 20);

        let contacts = (1..=3)
            .map(|id| contact_at(&ctx, &format!("me/contacts/{}", id)))
            .collect::<Vec<_>>();
        for contact in &contacts {
            contact.load_with(&["displayName"], &[]);
        }
        let err = ctx.execute_query().unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].index, 1);

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, format!("{}/$batch", ROOT));
        let envelope = requests[0].body.as_ref().unwrap().as_json().unwrap().clone();
        assert_eq!(
            envelope["requests"][0]["url"],
            "me/contacts/1?%24select=displayName"
        );

        assert_eq!(
            contacts[0].get_scalar::<String>("displayName").unwrap().as_deref(),
            Some("one")
        );
        assert_eq!(
            contacts[2].get_scalar::<String>("displayName").unwrap().as_deref(),
            Some("three")
        );
        assert_eq!(contacts[1].last_error().unwrap().code.as_deref(), Some("ErrorItemNotFound"));
    }

    #[test]
    fn groups_respect_max_batch_size() {
        let mock = MockExecutor::new();
        mock.push_response(ok(json!({"responses": [
            {"id": "0", "status": 200, "body": {}},
            {"id": "1", "status": 200, "body": {}}
        ]})))
        .push_response(ok(json!({})));
        let ctx = batched_context(&mock, 2);

        for id in 1..=3 {
            contact_at(&ctx, &format!("me/contacts/{}", id)).load();
        }
        ctx.execute_query().unwrap();

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].path.ends_with("$batch"));
        // A lone trailing query is sent as-is.
        assert_eq!(requests[1].path, format!("{}/me/contacts/3", ROOT));
    }

    #[test]
    fn unresolved_path_closes_the_group() {
        let mock = MockExecutor::new();
        mock.push_response(HttpResponse::json(201, json!({"id": "9"})))
            .push_response(no_content());
        let ctx = batched_context(&mock, 20);

        let contacts = EntityCollection::new(&ctx, &CONTACT, Some(path("me/contacts")));
        let contact = ClientObject::new(&ctx, &CONTACT, None);
        contact.set_property("displayName", "Ada").unwrap();
        contacts.create(&contact);
        contact.set_property("mobilePhone", "555").unwrap();
        contact.update();

        ctx.execute_query().unwrap();

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[1].method, Method::PATCH);
        assert_eq!(requests[1].path, format!("{}/me/contacts/9", ROOT));
    }

    #[test]
    fn transport_failure_fails_whole_group() {
        let mock = MockExecutor::new();
        mock.push_failure("timed out");
        let ctx = batched_context(&mock, 20);

        for id in 1..=3 {
            contact_at(&ctx, &format!("me/contacts/{}", id)).load();
        }
        let err = ctx.execute_query().unwrap_err();
        assert_eq!(err.failures().len(), 3);
        assert!(matches!(err.failures()[0].error, Error::Transport(_)));
        assert!(matches!(err.failures()[2].error, Error::Aborted { .. }));
    }

    #[test]
    fn upload_chunks_are_sent_alone_in_order() {
        let mock = MockExecutor::new();
        mock.push_response(ok(json!({"responses": [
            {"id": "0", "status": 200, "body": {"displayName": "one"}},
            {"id": "1", "status": 200, "body": {"displayName": "two"}}
        ]})))
        .push_response(ok(json!({})))
        .push_response(ok(json!({})))
        .push_response(ok(json!({"Name": "a.bin", "Length": 10})))
        .push_response(ok(json!({"displayName": "three"})));
        let ctx = batched_context(&mock, 20);

        contact_at(&ctx, "me/contacts/1").load();
        contact_at(&ctx, "me/contacts/2").load();
        let file = file_at(&ctx);
        let sent = queue_upload(&file);
        let last = contact_at(&ctx, "me/contacts/3");
        last.load();

        ctx.execute_query().unwrap();

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0].path, format!("{}/$batch", ROOT));
        for (request, operation) in requests[1..4]
            .iter()
            .zip(["StartUpload(", "ContinueUpload(", "FinishUpload("])
        {
            assert!(
                request.path.contains(&format!("/web/files/a.bin/{}", operation)),
                "unexpected chunk request {}",
                request.path
            );
        }
        assert_eq!(requests[4].path, format!("{}/me/contacts/3", ROOT));

        assert_eq!(*sent.lock().unwrap(), vec![4, 8, 10]);
        assert_eq!(file.get_scalar::<String>("Name").unwrap().as_deref(), Some("a.bin"));
        assert_eq!(
            last.get_scalar::<String>("displayName").unwrap().as_deref(),
            Some("three")
        );
    }

    #[test]
    fn failed_chunk_aborts_its_session_unsent() {
        let mock = MockExecutor::new();
        mock.push_response(MockExecutor::error_response(500, "upload rejected"));
        let ctx = batched_context(&mock, 20);

        let sent = queue_upload(&file_at(&ctx));
        let err = ctx.execute_query().unwrap_err();

        assert_eq!(err.failures().len(), 3);
        assert!(matches!(err.failures()[0].error, Error::Remote(_)));
        assert!(err.failures()[1..]
            .iter()
            .all(|failure| matches!(failure.error, Error::Aborted { .. })));
        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].path.contains("/StartUpload("));
        assert!(sent.lock().unwrap().is_empty());
    }
}
