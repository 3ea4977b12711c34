//! Append command against an in-memory transport.

mod common;

use common::{MockClient, MockConnection};
use eventstore_streams::wire::{
    AppendContent, AppendResp, AppendResult, AppendSuccess, ExpectedStreamRevision,
    WirePosition, WrongExpectedVersion,
};
use eventstore_streams::{
    ClientError, CurrentRevision, EventData, ExpectedRevision, Position, TransportError,
    WriteEventsToStream, WriteFailure, WriteResult,
};
use serde_json::json;
use std::time::Duration;

fn success(revision: u64) -> AppendResp {
    AppendResp {
        result: Some(AppendResult::Success(AppendSuccess {
            current_revision: Some(revision),
            position: Some(WirePosition {
                commit_position: 1_000,
                prepare_position: 1_000,
            }),
        })),
    }
}

// --- Successful Appends ---

#[test]
fn test_append_resolves_success() {
    let client = MockClient::new();
    client.respond_with(Ok(success(2)));
    let connection = MockConnection::new(client.clone());

    let result = WriteEventsToStream::new("orders-1")
        .expected_revision(ExpectedRevision::NoStream)
        .send([
            EventData::json("order-created", &json!({"total": 10})).unwrap(),
            EventData::json("order-paid", &json!({"amount": 10})).unwrap(),
            EventData::binary("receipt", b"%PDF".to_vec()),
        ])
        .execute(&connection)
        .unwrap()
        .wait();

    assert_eq!(result.typename(), "success");
    assert_eq!(
        result,
        WriteResult::Success {
            next_expected_version: 2,
            position: Some(Position::new(1_000, 1_000)),
        }
    );

    let recorded = client.recorded.lock();
    assert_eq!(recorded.appends.len(), 1);

    let messages = &recorded.appends[0];
    assert_eq!(messages.len(), 4);
    match &messages[0].content {
        Some(AppendContent::Options(options)) => {
            assert_eq!(options.stream_identifier.as_ref().unwrap().stream_name, b"orders-1");
            assert_eq!(
                options.expected_stream_revision,
                Some(ExpectedStreamRevision::NoStream)
            );
        }
        other => panic!("Expected options header, got {:?}", other),
    }

    let proposed: Vec<_> = messages[1..]
        .iter()
        .map(|m| match &m.content {
            Some(AppendContent::ProposedMessage(p)) => p.clone(),
            other => panic!("Expected proposed message, got {:?}", other),
        })
        .collect();
    assert_eq!(proposed[0].metadata["type"], "order-created");
    assert_eq!(proposed[0].metadata["content-type"], "application/json");
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&proposed[0].data).unwrap(),
        json!({"total": 10})
    );
    assert_eq!(proposed[1].metadata["type"], "order-paid");
    assert_eq!(proposed[2].metadata["content-type"], "application/octet-stream");
    assert_eq!(proposed[2].data, b"%PDF".to_vec());
}

#[test]
fn test_success_version_matches_response_for_any_precondition() {
    for (expected, revision) in [
        (ExpectedRevision::Any, 0),
        (ExpectedRevision::NoStream, 1),
        (ExpectedRevision::StreamExists, 17),
        (ExpectedRevision::Exact(41), 42),
    ] {
        let client = MockClient::new();
        client.respond_with(Ok(success(revision)));
        let connection = MockConnection::new(client);

        let result = WriteEventsToStream::new("s")
            .expected_revision(expected)
            .send([EventData::binary("t", vec![1])])
            .execute(&connection)
            .unwrap()
            .wait();

        match result {
            WriteResult::Success {
                next_expected_version,
                ..
            } => assert_eq!(next_expected_version, revision),
            other => panic!("Expected success for {:?}, got {:?}", expected, other),
        }
    }
}

#[test]
fn test_metadata_passed_through() {
    let client = MockClient::new();
    client.respond_with(Ok(success(0)));
    let connection = MockConnection::new(client.clone());

    WriteEventsToStream::new("s")
        .with_metadata("requires-leader", "true")
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap()
        .wait();

    let recorded = client.recorded.lock();
    assert_eq!(recorded.append_metadata[0]["requires-leader"], "true");
}

// --- Local Preconditions ---

#[test]
fn test_empty_batch_never_touches_transport() {
    let client = MockClient::new();
    let connection = MockConnection::new(client.clone());

    let result = WriteEventsToStream::new("orders").execute(&connection);

    assert!(matches!(result, Err(ClientError::EmptyBatch)));
    assert_eq!(connection.lookups(), 0);
    assert!(client.recorded.lock().append_metadata.is_empty());
}

#[test]
fn test_invalid_event_never_touches_transport() {
    let connection = MockConnection::new(MockClient::new());

    let result = WriteEventsToStream::new("orders")
        .send([EventData::binary("", vec![])])
        .execute(&connection);

    assert!(matches!(result, Err(ClientError::InvalidEvent { index: 0, .. })));
    assert_eq!(connection.lookups(), 0);
}

// --- Conflicts ---

#[test]
fn test_conflict_surfaces_as_failure() {
    let client = MockClient::new();
    client.respond_with(Ok(AppendResp {
        result: Some(AppendResult::WrongExpectedVersion(WrongExpectedVersion {
            current_revision: Some(5),
            expected_revision: Some(3),
            ..Default::default()
        })),
    }));
    let connection = MockConnection::new(client);

    let result = WriteEventsToStream::new("orders")
        .expected_revision(ExpectedRevision::Exact(3))
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap()
        .wait();

    assert_eq!(result.typename(), "failure");
    assert_eq!(
        result.failure(),
        Some(&WriteFailure::WrongExpectedVersion {
            current: CurrentRevision::Current(5),
            expected: ExpectedRevision::Exact(3),
        })
    );
}

#[test]
fn test_conflict_stream_exists_flag() {
    let client = MockClient::new();
    client.respond_with(Ok(AppendResp {
        result: Some(AppendResult::WrongExpectedVersion(WrongExpectedVersion {
            expected_stream_exists: true,
            ..Default::default()
        })),
    }));
    let connection = MockConnection::new(client);

    let result = WriteEventsToStream::new("orders")
        .expected_revision(ExpectedRevision::StreamExists)
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap()
        .wait();

    assert_eq!(
        result.failure(),
        Some(&WriteFailure::WrongExpectedVersion {
            current: CurrentRevision::NoStream,
            expected: ExpectedRevision::StreamExists,
        })
    );
}

// --- Transport Failures ---

#[test]
fn test_transport_error_response() {
    let client = MockClient::new();
    client.respond_with(Err(TransportError::Status {
        code: 4,
        message: "deadline exceeded".into(),
    }));
    let connection = MockConnection::new(client);

    let result = WriteEventsToStream::new("s")
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap()
        .wait();

    assert!(matches!(
        result.failure(),
        Some(WriteFailure::Transport(TransportError::Status { code: 4, .. }))
    ));
}

#[test]
fn test_unavailable_connection_resolves_failure() {
    let connection = MockConnection::unavailable();

    let pending = WriteEventsToStream::new("s")
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap();

    let result = pending.try_result().unwrap_or_else(|_| panic!("should be resolved"));
    assert!(matches!(
        result.failure(),
        Some(WriteFailure::Transport(TransportError::Unavailable(_)))
    ));
}

#[test]
fn test_write_failure_resolves_failure() {
    let client = MockClient::new();
    client.respond_with(Ok(success(0)));
    client.fail_write_at(2);
    let connection = MockConnection::new(client.clone());

    let result = WriteEventsToStream::new("s")
        .send([
            EventData::binary("a", vec![]),
            EventData::binary("b", vec![]),
            EventData::binary("c", vec![]),
        ])
        .execute(&connection)
        .unwrap()
        .wait();

    assert!(matches!(
        result.failure(),
        Some(WriteFailure::Transport(TransportError::Status { code: 14, .. }))
    ));
    assert!(client.recorded.lock().appends.is_empty());
}

#[test]
fn test_no_response_resolves_disconnected() {
    let connection = MockConnection::new(MockClient::new());

    let result = WriteEventsToStream::new("s")
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap()
        .wait_timeout(Duration::from_secs(1))
        .unwrap_or_else(|_| panic!("closed call must resolve"));

    assert_eq!(
        result.failure(),
        Some(&WriteFailure::Transport(TransportError::Disconnected))
    );
}

#[test]
fn test_unknown_response_shape() {
    let client = MockClient::new();
    client.respond_with(Ok(AppendResp { result: None }));
    let connection = MockConnection::new(client);

    let result = WriteEventsToStream::new("s")
        .send([EventData::binary("t", vec![])])
        .execute(&connection)
        .unwrap()
        .wait();

    assert_eq!(result.failure(), Some(&WriteFailure::UnknownResponse));
}

#[test]
fn test_command_is_reusable() {
    let client = MockClient::new();
    let connection = MockConnection::new(client.clone());
    let command = WriteEventsToStream::new("s").send([EventData::binary("t", vec![])]);

    client.respond_with(Ok(success(0)));
    assert!(command.execute(&connection).unwrap().wait().is_success());

    client.respond_with(Ok(success(1)));
    assert!(command.execute(&connection).unwrap().wait().is_success());

    assert_eq!(client.recorded.lock().appends.len(), 2);
}
