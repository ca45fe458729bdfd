use super::block::*;
use super::history::*;
use super::status::*;
use super::turn::*;

fn record(json: serde_json::Value) -> RawRecord {
    serde_json::from_value(json).unwrap()
}

#[test]
fn test_plain_string_response() {
    let turns = normalize(&[RawRecord::new(Some("hi"), Some("hello"))]);
    assert_eq!(
        turns,
        vec![Turn::exchange(
            Some("hi".into()),
            vec![ContentBlock::text("hello")]
        )]
    );
}

#[test]
fn test_welcome_record() {
    let turns = normalize(&[record(serde_json::json!({
        "message": null,
        "response": "Welcome! I am a chatbot programmed to assist you..."
    }))]);
    assert_eq!(turns.len(), 1);
    assert!(turns[0].is_welcome());
    assert!(turns[0].blocks().is_empty());
    assert!(!turns[0].has_user_side());
}

#[test]
fn test_welcome_marker_requires_absent_message() {
    let turns = normalize(&[RawRecord::new(
        Some("say the greeting"),
        Some("Welcome! I am a chatbot programmed to help."),
    )]);
    assert!(!turns[0].is_welcome());
    assert_eq!(turns[0].blocks().len(), 1);
}

#[test]
fn test_serialized_block_payload() {
    let payload = serde_json::json!({
        "content": [
            {"type": "text", "body": "Here is the graph"},
            {"type": "image", "url": "/graphs/cfg/a.png", "subtype": "cfg"}
        ]
    })
    .to_string();
    let turns = normalize(&[RawRecord::new(Some("graph"), Some(&payload))]);
    assert_eq!(
        turns[0].blocks(),
        &[
            ContentBlock::text("Here is the graph"),
            ContentBlock::image("/graphs/cfg/a.png", Some("cfg")),
        ]
    );
}

#[test]
fn test_bare_block_array_payload() {
    let payload = r#"[{"type": "code", "body": "x = 1", "language": "python"}]"#;
    let turns = normalize(&[RawRecord::new(Some("q"), Some(payload))]);
    assert_eq!(
        turns[0].blocks(),
        &[ContentBlock::code("x = 1", Some("python".into()))]
    );
}

#[test]
fn test_already_decoded_structured_response() {
    let turns = normalize(&[record(serde_json::json!({
        "message": "q",
        "response": {"content": [{"type": "text", "body": "structured"}]}
    }))]);
    assert_eq!(turns[0].blocks(), &[ContentBlock::text("structured")]);
}

#[test]
fn test_unparseable_payload_falls_back_to_text() {
    let broken = r#"{"content": [{"type": "text", "body": "unterminated"#;
    let turns = normalize(&[
        RawRecord::new(Some("a"), Some(broken)),
        RawRecord::new(Some("b"), Some("after")),
    ]);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].blocks(), &[ContentBlock::text(broken)]);
    assert_eq!(turns[1].blocks(), &[ContentBlock::text("after")]);
}

#[test]
fn test_json_that_is_not_a_payload_stays_text() {
    for raw in [r#"{"answer": 42}"#, "[1, 2, 3]", "42", r#""quoted""#] {
        let turns = normalize(&[RawRecord::new(Some("q"), Some(raw))]);
        assert_eq!(turns[0].blocks(), &[ContentBlock::text(raw)], "{raw}");
    }
}

#[test]
fn test_legacy_sources_payload() {
    let payload = r#"{"sources": [{"path": "db.users", "reason": "has emails"}]}"#;
    let turns = normalize(&[RawRecord::new(Some("where?"), Some(payload))]);
    assert_eq!(
        turns[0].blocks(),
        &[ContentBlock::text("Path: db.users\nReason: has emails")]
    );

    let turns = normalize(&[RawRecord::new(Some("where?"), Some(r#"{"sources": []}"#))]);
    assert_eq!(turns[0].blocks(), &[ContentBlock::text(NO_SOURCES_MESSAGE)]);
}

#[test]
fn test_split_record_order() {
    let turns = normalize(&[record(serde_json::json!({
        "message": "analyze",
        "response": "int main() { return 0; }",
        "reasoning": "The function has one path.",
        "cfg_image_url": "/graphs/cfg/1.png",
        "dfg_image_url": "/graphs/dfg/1.png"
    }))]);
    assert_eq!(
        turns[0].blocks(),
        &[
            ContentBlock::reasoning("The function has one path."),
            ContentBlock::code("int main() { return 0; }", None),
            ContentBlock::image("/graphs/cfg/1.png", Some("cfg")),
            ContentBlock::image("/graphs/dfg/1.png", Some("dfg")),
        ]
    );
}

#[test]
fn test_split_record_partial_fields() {
    let turns = normalize(&[record(serde_json::json!({
        "message_text": "graph only",
        "response_text": "",
        "reasoning": "",
        "dfg_image_url": "/graphs/dfg/2.png"
    }))]);
    assert_eq!(turns[0].user_text.as_deref(), Some("graph only"));
    assert_eq!(
        turns[0].blocks(),
        &[ContentBlock::image("/graphs/dfg/2.png", Some("dfg"))]
    );
}

#[test]
fn test_legacy_field_names() {
    let turns = normalize(&[record(serde_json::json!({
        "message_text": "old question",
        "response_text": "old answer"
    }))]);
    assert_eq!(
        turns[0],
        Turn::exchange(
            Some("old question".into()),
            vec![ContentBlock::text("old answer")]
        )
    );
}

#[test]
fn test_empty_record_keeps_its_slot() {
    let turns = normalize(&[
        RawRecord::new(Some("a"), Some("1")),
        RawRecord::default(),
        RawRecord::new(Some("b"), Some("2")),
    ]);
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].assistant, Some(vec![]));
    assert!(!turns[1].is_welcome());
}

#[test]
fn test_order_and_duplicates_preserved() {
    let records = vec![
        RawRecord::new(Some("same"), Some("x")),
        RawRecord::new(Some("same"), Some("x")),
        RawRecord::new(Some("later"), Some("y")),
    ];
    let turns = normalize(&records);
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0], turns[1]);
    assert_eq!(turns[2].user_text.as_deref(), Some("later"));
}

#[test]
fn test_normalize_is_idempotent_on_canonical_records() {
    let records = vec![
        RawRecord::new(None, Some(WELCOME_GREETING)),
        RawRecord::new(Some("hi"), Some("hello")),
        record(serde_json::json!({
            "message": "analyze",
            "response": "int x;",
            "reasoning": "trivial",
            "cfg_image_url": "/graphs/cfg/1.png"
        })),
        RawRecord::new(Some("where?"), Some(r#"{"sources": []}"#)),
        RawRecord::new(Some("nothing"), None),
        RawRecord::new(None, Some("orphan reply")),
    ];
    let first = normalize(&records);

    let canonical: Vec<RawRecord> = first.iter().map(canonical_record).collect();
    assert_eq!(normalize(&canonical), first);

    // the same records stored as serialized strings decode identically
    let as_strings: Vec<RawRecord> = canonical
        .iter()
        .map(|r| RawRecord {
            response: r.response.as_ref().map(|resp| match resp {
                ResponseField::Structured(v) => ResponseField::Text(v.to_string()),
                other => other.clone(),
            }),
            ..r.clone()
        })
        .collect();
    assert_eq!(normalize(&as_strings), first);
}

#[test]
fn test_content_block_wire_tags() {
    let blocks: Vec<ContentBlock> = serde_json::from_str(
        r#"[
            {"type": "text", "body": "a"},
            {"type": "text", "content": "b"},
            {"type": "reasoning", "text": "c"},
            {"type": "code", "body": "d"},
            {"type": "image", "url": "e"},
            {"type": "table", "rows": []}
        ]"#,
    )
    .unwrap();
    assert_eq!(
        blocks,
        vec![
            ContentBlock::text("a"),
            ContentBlock::text("b"),
            ContentBlock::reasoning("c"),
            ContentBlock::code("d", None),
            ContentBlock::image("e", None),
            ContentBlock::Unknown,
        ]
    );

    let json = serde_json::to_value(ContentBlock::image("u", Some("cfg"))).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"type": "image", "url": "u", "subtype": "cfg"})
    );
}

#[test]
fn test_turn_constructors() {
    let user = Turn::user(Some("q".into()), None);
    assert!(user.has_user_side());
    assert!(user.assistant.is_none());

    let reply = Turn::error("Error: boom".into());
    assert!(!reply.has_user_side());
    assert_eq!(reply.blocks(), &[ContentBlock::text("Error: boom")]);
}

#[test]
fn test_decision_wire_values() {
    let status: AccountStatus =
        serde_json::from_str(r#"{"role": "dev", "decision": "1"}"#).unwrap();
    assert_eq!(status.decision, Some(Decision::Approved));
    assert!(status.is_concluded());

    let status: AccountStatus = serde_json::from_str(r#"{"decision": "0"}"#).unwrap();
    assert_eq!(status.decision, Some(Decision::Rejected));

    let status: AccountStatus = serde_json::from_str(r#"{"decision": "N/A"}"#).unwrap();
    assert!(!status.is_concluded());

    let status: AccountStatus = serde_json::from_str("{}").unwrap();
    assert_eq!(status, AccountStatus::default());
}
