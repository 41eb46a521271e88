use pretty_assertions::assert_eq;
use serde_json::json;

use blockmark::decoder::{decode, decode_partial, try_decode};
use blockmark::descriptor::{BlockKind, Dimension, VideoContent};
use blockmark::pending::{detect_pending, trailing_marker_prefix};
use blockmark::scanner::{find_blocks, find_placeholders, placeholder_markup};
use blockmark::{PlaceholderId, scan};

const VIDEO: &str = r#"!#block#! {"type":"video","content":{"src":"a.mp4"}} !#/block#!"#;
const HTML: &str = r#"!#block#!
{"type":"html","content":"<b>hi</b>"}
!#/block#!"#;

const LITERAL_ANCHOR: &str = r#"<div data-custom-block-id="custom-block-0"></div>"#;

fn ids(text: &str) -> Vec<String> {
    find_placeholders(text).iter().map(|id| id.to_string()).collect()
}

#[test]
fn valid_video_block_decodes() {
    let result = scan(VIDEO);
    assert_eq!(result.registry.len(), 1);

    let descriptor = result.registry.get("custom-block-0").expect("entry");
    assert_eq!(descriptor.type_name(), "video");
    assert!(descriptor.is_complete);
    assert!(!descriptor.is_loading);
    assert_eq!(descriptor.parse_error, None);
    match &descriptor.kind {
        BlockKind::Video(content) => assert_eq!(content.src.as_deref(), Some("a.mp4")),
        other => panic!("expected video, got {:?}", other),
    }
}

#[test]
fn block_is_replaced_by_placeholder() {
    let result = scan(&format!("before\n\n{}\n\nafter", VIDEO));
    assert_eq!(
        result.processed_text,
        format!(
            "before\n\n{}\n\nafter",
            placeholder_markup(PlaceholderId::new(0))
        )
    );
}

#[test]
fn markers_without_whitespace_match() {
    let result = scan(r#"!#block#!{"type":"unknown_x","content":"hi"}!#/block#!"#);
    let descriptor = result.registry.get("custom-block-0").expect("entry");
    assert_eq!(
        descriptor.kind,
        BlockKind::Unknown {
            type_name: "unknown_x".to_string(),
            content: json!("hi"),
        }
    );
}

#[test]
fn two_blocks_numbered_in_source_order() {
    let text = format!("# Title\n\n{}\n\ntext\n\n{}\n", HTML, VIDEO);
    let result = scan(&text);

    assert_eq!(result.registry.len(), 2);
    assert_eq!(ids(&result.processed_text), vec!["custom-block-0", "custom-block-1"]);
    assert_eq!(result.registry.get("custom-block-0").map(|d| d.type_name()), Some("html"));
    assert_eq!(result.registry.get("custom-block-1").map(|d| d.type_name()), Some("video"));
}

#[test]
fn placeholders_and_registry_are_a_bijection() {
    let inputs = [
        String::new(),
        "plain text".to_string(),
        format!("{}{}{}", VIDEO, HTML, VIDEO),
        format!("{}\n!#block#! {{ broken }} !#/block#!\n{}", VIDEO, HTML),
        format!("{}\n!#block#! {{\"type\":\"video\"", HTML),
        format!("{}\n\n{}\n", HTML, LITERAL_ANCHOR),
        format!("{}{}{}", LITERAL_ANCHOR, VIDEO, LITERAL_ANCHOR),
    ];

    for input in &inputs {
        let result = scan(input);
        let found = find_placeholders(&result.processed_text);
        let keys: Vec<PlaceholderId> = result.registry.ids().collect();
        assert_eq!(found, keys, "input: {:?}", input);

        let mut sorted = found.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), found.len(), "duplicate placeholder in {:?}", input);
    }
}

#[test]
fn scanning_processed_text_is_idempotent() {
    let text = format!("intro\n\n{}\n\n{}\n\nend", VIDEO, HTML);
    let first = scan(&text);
    let second = scan(&first.processed_text);
    assert_eq!(second.processed_text, first.processed_text);
    assert!(second.registry.is_empty());
}

#[test]
fn author_anchor_cannot_pose_as_block() {
    let text = format!("{}\n\n{}\n", HTML, LITERAL_ANCHOR);
    let result = scan(&text);

    assert_eq!(ids(&result.processed_text), vec!["custom-block-0"]);
    assert!(
        result
            .processed_text
            .contains(r#"<div data-custom-block-literal="custom-block-0"></div>"#),
        "{}",
        result.processed_text
    );

    // Without any marker there is nothing to collide with.
    let plain = scan(LITERAL_ANCHOR);
    assert_eq!(plain.processed_text, LITERAL_ANCHOR);
}

#[test]
fn malformed_block_keeps_its_slot() {
    let text = format!("!#block#! {{\"type\":\"video\",\"content\":}} !#/block#!\n\n{}", HTML);
    let result = scan(&text);

    assert_eq!(result.registry.len(), 2);
    let broken = result.registry.get("custom-block-0").expect("entry");
    assert!(broken.parse_error.is_some());
    assert!(!broken.is_complete);
    assert!(!broken.is_loading);
    assert_eq!(broken.kind, BlockKind::Video(VideoContent::default()));

    let html = result.registry.get("custom-block-1").expect("entry");
    assert_eq!(html.kind, BlockKind::Html("<b>hi</b>".to_string()));

    assert_eq!(result.diagnostics.len(), 1);
    let diagnostic = &result.diagnostics[0];
    assert!(diagnostic.is_warning());
    let block = diagnostic.block_span.clone().expect("block span");
    assert_eq!(block.start, 0);
    assert!(block.start <= diagnostic.span.start && diagnostic.span.end <= block.end);
}

#[test]
fn unterminated_block_is_left_in_text() {
    let text = "# T\n\n!#block#! {\"type\":\"video\",\"content\":{\"src\":\"";
    let result = scan(text);
    assert!(result.registry.is_empty());
    assert_eq!(result.processed_text, text);
    assert!(find_blocks(text).is_empty());
}

#[test]
fn pending_block_infers_type_from_partial_json() {
    let text = "# T\n\n!#block#! {\"type\":\"video\",\"content\":{\"src\":\"";
    let pending = detect_pending(text, 0).expect("pending block");
    assert_eq!(pending.offset, 5);
    assert_eq!(pending.id.to_string(), "custom-block-0");
    assert!(pending.descriptor.is_loading);
    assert!(!pending.descriptor.is_complete);
    assert_eq!(pending.descriptor.type_name(), "video");
}

#[test]
fn pending_block_keeps_partial_dimensions() {
    let text = r#"!#block#! {"type":"video","content":{"additional":{"width":"640px","height":360,"poster":"p"#;
    let pending = detect_pending(text, 3).expect("pending block");
    assert_eq!(pending.id, PlaceholderId::new(3));
    match pending.descriptor.kind {
        BlockKind::Video(content) => {
            assert_eq!(content.src, None);
            assert_eq!(content.additional.width, Some(Dimension::Text("640px".into())));
            assert_eq!(content.additional.height, Some(Dimension::Number(360.0)));
            assert_eq!(content.additional.poster, None);
        }
        other => panic!("expected video, got {:?}", other),
    }
}

#[test]
fn malformed_block_with_close_marker_is_not_pending() {
    let text = "!#block#! not json !#/block#! and then !#block#! {\"type\":\"html\"";
    let pending = detect_pending(text, 0).expect("pending block");
    assert_eq!(pending.offset, text.rfind("!#block#!").unwrap_or_default());
    assert_eq!(pending.descriptor.type_name(), "html");

    assert_eq!(detect_pending("!#block#! not json !#/block#!", 0), None);
    assert_eq!(detect_pending("no markers", 0), None);
}

#[test]
fn literal_marker_is_not_pending() {
    let text = "Use `!#block#!` to open a block.\n\nThe rest of the answer.\n";
    assert_eq!(detect_pending(text, 0), None);

    let later = "Use `!#block#!` like so:\n\n!#block#! {\"type\":\"video\"";
    let pending = detect_pending(later, 0).expect("pending block");
    assert_eq!(pending.offset, later.rfind("!#block#!").unwrap_or_default());
    assert_eq!(pending.descriptor.type_name(), "video");

    // A bare marker at the end may still be followed by a payload.
    assert!(detect_pending("text !#block#!", 0).is_some());
    assert!(detect_pending("text !#block#!  \n", 0).is_some());
}

#[test]
fn trailing_marker_prefix_is_measured() {
    assert_eq!(trailing_marker_prefix("text !#bl"), 4);
    assert_eq!(trailing_marker_prefix("text !#block#"), 8);
    assert_eq!(trailing_marker_prefix("text !#"), 0);
    assert_eq!(trailing_marker_prefix("text !#block#!"), 0);
    assert_eq!(trailing_marker_prefix("plain"), 0);
}

#[test]
fn streaming_prefixes_never_regress() {
    let full = format!("# Stream\n\n{}\n\nmiddle\n\n{}\n\ndone", VIDEO, HTML);
    let final_result = scan(&full);

    let mut ready_at: Vec<Option<usize>> = vec![None; final_result.registry.len()];
    for end in (0..=full.len()).filter(|&i| full.is_char_boundary(i)) {
        let prefix = &full[..end];
        let result = scan(prefix);
        let next = result.registry.next_index();
        let _ = detect_pending(&result.processed_text, next);

        for (id, descriptor) in result.registry.iter() {
            let expected = final_result.registry.get_id(*id).expect("block exists in final scan");
            assert_eq!(descriptor, expected, "block {} changed at prefix {}", id, end);
            ready_at[id.index()].get_or_insert(end);
        }
        for (index, first) in ready_at.iter().enumerate() {
            if first.is_some() {
                assert!(
                    result.registry.get_id(PlaceholderId::new(index)).is_some(),
                    "block {} disappeared at prefix {}",
                    index,
                    end
                );
            }
        }
    }
    assert!(ready_at.iter().all(Option::is_some));
}

#[test]
fn decode_coerces_wrong_content_shapes() {
    let html = decode(r#"{"type":"html","content":{"not":"a string"}}"#);
    assert_eq!(html.kind, BlockKind::Html(String::new()));
    assert!(html.is_complete);

    let video = decode(r#"{"type":"video","content":"a.mp4"}"#);
    assert_eq!(video.kind, BlockKind::Video(VideoContent::default()));

    let untyped = decode(r#"{"content":"x"}"#);
    assert_eq!(untyped.type_name(), "");
    assert!(untyped.parse_error.is_none());
}

#[test]
fn decode_reports_failures() {
    assert!(try_decode("[1, 2]").is_err());

    let descriptor = decode(r#"{"type":"markdown","content":"unterminated}"#);
    assert_eq!(descriptor.kind, BlockKind::Markdown(String::new()));
    let message = descriptor.parse_error.expect("parse error");
    assert!(message.starts_with("invalid block JSON"), "{}", message);
}

#[test]
fn decode_partial_without_payload_is_untyped_loading() {
    let descriptor = decode_partial("   ");
    assert!(descriptor.is_loading);
    assert_eq!(descriptor.type_name(), "");
}

#[test]
fn placeholder_ids_parse_back() {
    assert_eq!(PlaceholderId::parse("custom-block-12"), Some(PlaceholderId::new(12)));
    assert_eq!(PlaceholderId::parse("custom-block-"), None);
    assert_eq!(PlaceholderId::parse("custom-block-1a"), None);
    assert_eq!(PlaceholderId::parse("other-1"), None);
}
