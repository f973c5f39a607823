use std::convert::Infallible;

use futures::executor::block_on;
use futures::stream;
use greenfloor_dashboard_core::sse::pump;
use greenfloor_dashboard_core::{LiveToken, SseDecoder, StreamEvent, StreamOutcome};
use quickcheck::{QuickCheck, TestResult};
use serde_json::json;

const RECORDS: [&str; 6] = [
    r#"{"type":"cmd","data":{"cmd":"greenfloor-manager coins-split --pair byc:xch"}}"#,
    r#"{"type":"text_line","data":"splitting ✔ 3 coins · ünïcødé"}"#,
    r#"{"type":"json_line","data":{"event":"coin_split","ok":true}}"#,
    "not json at all",
    r#"{"type":"stderr_line","data":"warn: low fee"}"#,
    r#"{"type":"done","data":{"exit_code":0,"ok":true}}"#,
];

fn transcript() -> Vec<u8> {
    RECORDS
        .iter()
        .map(|record| format!("data: {record}\n\n"))
        .collect::<String>()
        .into_bytes()
}

fn expected() -> Vec<StreamEvent> {
    vec![
        StreamEvent::Cmd {
            cmd: "greenfloor-manager coins-split --pair byc:xch".to_string(),
        },
        StreamEvent::TextLine("splitting ✔ 3 coins · ünïcødé".to_string()),
        StreamEvent::JsonLine(json!({"event": "coin_split", "ok": true})),
        StreamEvent::StderrLine(json!("warn: low fee")),
        StreamEvent::Done {
            exit_code: Some(0),
            ok: true,
        },
    ]
}

/// Splits `bytes` at the given offsets (taken modulo the length).
fn chunked(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut offsets: Vec<usize> = cuts.iter().map(|cut| cut % (bytes.len() + 1)).collect();
    offsets.push(0);
    offsets.push(bytes.len());
    offsets.sort_unstable();
    offsets.dedup();
    offsets
        .windows(2)
        .map(|window| bytes[window[0]..window[1]].to_vec())
        .collect()
}

#[test]
fn arbitrary_splits_decode_identically() {
    fn property(cuts: Vec<usize>) -> TestResult {
        let bytes = transcript();
        let mut decoder = SseDecoder::new();
        let events: Vec<StreamEvent> = chunked(&bytes, &cuts)
            .iter()
            .flat_map(|chunk| decoder.feed(chunk))
            .collect();
        TestResult::from_bool(
            events == expected() && decoder.dropped() == 1 && decoder.pending() == 0,
        )
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(property as fn(Vec<usize>) -> TestResult);
}

#[test]
fn trailing_partial_record_is_never_delivered() {
    fn property(cuts: Vec<usize>, keep: usize) -> TestResult {
        let tail = br#"data: {"type":"text_line","data":"half"#;
        let keep = keep % (tail.len() + 1);
        let mut bytes = transcript();
        bytes.extend_from_slice(&tail[..keep]);

        let chunks = chunked(&bytes, &cuts);
        let mut received = Vec::new();
        let outcome = block_on(pump(
            stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)),
            &LiveToken::new(),
            &mut |event| received.push(event),
        ));
        TestResult::from_bool(
            outcome == Ok(StreamOutcome::Completed { delivered: 5 }) && received == expected(),
        )
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(property as fn(Vec<usize>, usize) -> TestResult);
}

#[test]
fn revoking_mid_stream_stops_delivery() {
    let token = LiveToken::new();
    let revoker = token.clone();
    let chunks = chunked(&transcript(), &[7, 40, 90, 130, 200]);
    let mut received = Vec::new();
    let outcome = block_on(pump(
        stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)),
        &token,
        &mut |event| {
            received.push(event);
            revoker.revoke();
        },
    ));
    assert_eq!(outcome, Ok(StreamOutcome::Abandoned));
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind(), "cmd");
}
