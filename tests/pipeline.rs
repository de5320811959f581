// tests/pipeline.rs
use std::io::Write;

use cova_assist::{
    EndpointClient, EndpointMap, ErrorKind, ImageHandle, ImageSerializer, Mode, PathSource, ProcessOutcome,
    RequestState, ServiceConfig, Session, ValidationReason,
};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

fn image_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(&[0x01, 0x02, 0x03]).expect("write image");
    file
}

fn session_for(server: &MockServer) -> Session<EndpointClient> {
    let config = ServiceConfig::new("mock", &server.base_url(), EndpointMap::full());
    Session::new(
        EndpointClient::new(config).expect("client"),
        ImageSerializer::new().expect("serializer"),
    )
}

#[test]
fn each_mode_hits_its_own_endpoint_once() {
    let server = MockServer::start();
    let atm = server.mock(|when, then| {
        when.method(POST).path("/ATMpredict").json_body(json!({ "image_bytes": [1, 2, 3] }));
        then.status(200).json_body(json!({ "label": "door" }));
    });
    let walking = server.mock(|when, then| {
        when.method(POST)
            .path("/WApredict")
            .json_body(json!({ "image_bytes": [1, 2, 3], "question": "Any stairs ahead?" }));
        then.status(200).json_body(json!({ "result": "Stairs in two metres" }));
    });
    let vlm = server.mock(|when, then| {
        when.method(POST)
            .path("/VLMpredict")
            .json_body(json!({ "image_bytes": [1, 2, 3], "question": "Any stairs ahead?" }));
        then.status(200).json_body(json!({ "result": "No", "device": "cpu" }));
    });

    let file = image_file();
    let session = session_for(&server).with_question("Any stairs ahead?");
    session.select(&mut PathSource::new(ImageHandle::from_path(file.path())));

    for mode in Mode::ALL {
        session.set_mode(mode);
        let outcome = session.process();
        assert!(
            matches!(outcome, ProcessOutcome::Completed(RequestState::Succeeded(_))),
            "{} failed: {:?}",
            mode,
            outcome
        );
    }

    atm.assert_hits(1);
    walking.assert_hits(1);
    vlm.assert_hits(1);

    let state = session.state();
    let result = state.result().expect("vqa result");
    assert_eq!(result.device.as_deref(), Some("cpu"));
    assert_eq!(result.payload["result"], "No");
}

#[test]
fn atm_door_label_round_trip() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/ATMpredict");
        then.status(200).json_body(json!({ "label": "door" }));
    });

    let file = image_file();
    let session = session_for(&server).with_mode(Mode::Atm);
    session.set_image(ImageHandle::from_path(file.path()));
    session.process();

    let state = session.state();
    let result = state.result().expect("succeeded");
    assert_eq!(result.payload["label"], "door");
    assert!(result.payload["responseTimeMs"].is_u64());
}

#[test]
fn server_error_leaves_session_failed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/WApredict");
        then.status(500);
    });

    let file = image_file();
    let session = session_for(&server).with_mode(Mode::Walking);
    session.set_image(ImageHandle::from_path(file.path()));
    session.process();

    let state = session.state();
    assert!(state.result().is_none());
    assert_eq!(state.failure().map(|f| f.kind), Some(ErrorKind::Http { status: 500 }));
}

#[test]
fn blank_question_in_vqa_mode_sends_nothing() {
    let server = MockServer::start();
    let vlm = server.mock(|when, then| {
        when.method(POST).path("/VLMpredict");
        then.status(200).json_body(json!({ "result": "unused" }));
    });

    let file = image_file();
    let session = session_for(&server).with_mode(Mode::Vqa).with_question("   ");
    session.set_image(ImageHandle::from_path(file.path()));
    session.process();

    vlm.assert_hits(0);
    assert_eq!(
        session.state().failure().map(|f| f.kind),
        Some(ErrorKind::Validation(ValidationReason::MissingQuestion))
    );
}

#[test]
fn unsupported_mode_on_standard_deployment_fails_validation() {
    let server = MockServer::start();
    let config = ServiceConfig::new("standard", &server.base_url(), EndpointMap::standard());
    let session = Session::new(EndpointClient::new(config).unwrap(), ImageSerializer::new().unwrap())
        .with_mode(Mode::Vqa)
        .with_question("What is this?");

    let file = image_file();
    session.set_image(ImageHandle::from_path(file.path()));
    session.process();

    assert_eq!(
        session.state().failure().map(|f| f.kind),
        Some(ErrorKind::Validation(ValidationReason::UnsupportedMode))
    );
}
