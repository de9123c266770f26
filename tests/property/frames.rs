//! Property-based push-frame round-trip tests.
//!
//! Uses proptest to verify:
//! 1. Any valid `ServerFrame` survives encode → decode round-trip.
//! 2. Any valid `ClientFrame` survives encode → decode round-trip.
//! 3. Arbitrary text never causes a panic in the decoders (returns `Err`
//!    gracefully).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use boardsync_proto::chat::{ChatMessage, Sender};
use boardsync_proto::push::{
    ClientFrame, ServerFrame, decode_client, decode_server, encode_client, encode_server,
};
use boardsync_proto::task::{Assignee, Task, TaskId, TaskStatus};

// --- Strategies for protocol types ---

/// Identifier-ish strings: non-empty, no control characters.
fn arb_id() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,24}"
}

/// Free text, excluding NUL to keep assertions readable on failure.
fn arb_text() -> impl Strategy<Value = String> {
    "[^\x00]{0,128}"
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

/// Whole-second timestamps in a plausible range (1970..2100).
fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800).prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap())
}

fn arb_assignee() -> impl Strategy<Value = Assignee> {
    (arb_id(), prop::option::of(arb_text()), prop::option::of(arb_id())).prop_map(
        |(id, name, email)| Assignee { id, name, email },
    )
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_id(),
        arb_text(),
        prop::option::of(arb_text()),
        arb_status(),
        any::<i64>(),
        arb_id(),
        prop::option::of(arb_assignee()),
        arb_timestamp(),
    )
        .prop_map(
            |(id, title, description, status, position, project_id, assigned_to, created_at)| {
                Task {
                    id: TaskId::new(id),
                    title,
                    description,
                    status,
                    position,
                    project_id,
                    assigned_to,
                    created_at,
                }
            },
        )
}

fn arb_message() -> impl Strategy<Value = ChatMessage> {
    (
        arb_id(),
        arb_id(),
        (arb_id(), prop::option::of(arb_text()), prop::option::of(arb_id())),
        arb_text(),
        arb_timestamp(),
    )
        .prop_map(|(id, team_id, (sid, sname, semail), content, created_at)| ChatMessage {
            id,
            team_id,
            sender: Sender {
                id: sid,
                name: sname,
                email: semail,
            },
            content,
            created_at,
        })
}

fn arb_server_frame() -> impl Strategy<Value = ServerFrame> {
    prop_oneof![
        arb_task().prop_map(|task| ServerFrame::TaskCreated { task }),
        arb_task().prop_map(|task| ServerFrame::TaskUpdated { task }),
        arb_task().prop_map(|task| ServerFrame::TaskMoved { task }),
        (arb_id(), arb_id()).prop_map(|(task_id, project_id)| ServerFrame::TaskDeleted {
            task_id: TaskId::new(task_id),
            project_id,
        }),
        arb_message().prop_map(|message| ServerFrame::NewMessage { message }),
    ]
}

fn arb_client_frame() -> impl Strategy<Value = ClientFrame> {
    prop_oneof![
        arb_id().prop_map(|team_id| ClientFrame::JoinRoom { team_id }),
        arb_id().prop_map(|team_id| ClientFrame::LeaveRoom { team_id }),
    ]
}

// --- Property tests ---

proptest! {
    /// Any valid ServerFrame survives an encode → decode round-trip.
    #[test]
    fn server_frame_round_trip(frame in arb_server_frame()) {
        let text = encode_server(&frame).expect("encode should succeed");
        let decoded = decode_server(&text).expect("decode should succeed");
        prop_assert_eq!(frame, decoded);
    }

    /// Any valid ClientFrame survives an encode → decode round-trip.
    #[test]
    fn client_frame_round_trip(frame in arb_client_frame()) {
        let text = encode_client(&frame).expect("encode should succeed");
        let decoded = decode_client(&text).expect("decode should succeed");
        prop_assert_eq!(frame, decoded);
    }

    /// Arbitrary text never panics the server-frame decoder.
    #[test]
    fn decode_server_never_panics(text in ".*") {
        let _ = decode_server(&text);
    }

    /// Arbitrary text never panics the client-frame decoder.
    #[test]
    fn decode_client_never_panics(text in ".*") {
        let _ = decode_client(&text);
    }

    /// A frame with the right shape but an unknown event name is an
    /// error, not a misparse into some known variant.
    #[test]
    fn unknown_events_are_rejected(event in "[a-z]{1,12}:[a-z]{1,12}") {
        prop_assume!(![
            "task:created",
            "task:updated",
            "task:moved",
            "task:deleted",
            "chat:new-message",
        ]
        .contains(&event.as_str()));
        let text = format!(r#"{{"event": "{event}", "data": {{}}}}"#);
        prop_assert!(decode_server(&text).is_err());
    }
}
