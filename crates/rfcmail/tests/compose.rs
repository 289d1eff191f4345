//! Integration tests for message composition.
//!
//! Boundaries and content ids are generated, so the tests read them back
//! from the rendered output instead of hard-coding them.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;

use rfcmail::{LineEnding, Message, Part, PartKind, RenderConfig, format_address};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Message with a fixed date and a single plain-text body.
fn message_with_body(subject: &str) -> Message {
    init_tracing();

    let mut message = Message::new();
    message.set_subject(subject);
    message.set_date(Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap());
    message
        .add_body(Part::body("text/plain", "Hello world").unwrap())
        .unwrap();
    message
}

/// Returns the boundaries declared in `rendered`, outermost first.
fn boundaries(rendered: &str) -> Vec<&str> {
    rendered
        .match_indices("boundary=\"")
        .map(|(index, marker)| {
            let start = index + marker.len();
            let end = start + rendered[start..].find('"').unwrap();
            &rendered[start..end]
        })
        .collect()
}

/// Returns the root header block.
fn header_block(rendered: &str) -> &str {
    let end = rendered.find("\r\n\r\n").unwrap();
    &rendered[..end + 2]
}

fn position(rendered: &str, needle: &str) -> usize {
    rendered
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in:\n{rendered}"))
}

#[test]
fn test_single_body_message() {
    let mut message = message_with_body("Test message");
    let rendered = message.as_string().unwrap();
    let headers = header_block(&rendered);

    assert!(headers.starts_with("MIME-Version: 1.0\r\n"));
    assert!(headers.contains("Content-Type: text/plain; charset=\"UTF-8\"\r\n"));
    assert!(headers.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
    assert!(headers.contains("To: undisclosed-recipients\r\n"));
    assert!(headers.contains("Date: Fri, 17 May 2024 08:30:00 GMT\r\n"));
    assert!(headers.contains("Subject: Test message\r\n"));
    assert!(boundaries(&rendered).is_empty());
    assert!(rendered.ends_with("\r\n\r\nHello world\r\n"));
}

#[test]
fn test_alternative_bodies_keep_insertion_order() {
    let mut message = message_with_body("Alternatives");
    message
        .add_body(
            Part::body(
                "application/xhtml+xml",
                "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body>Hello world</body></html>",
            )
            .unwrap(),
        )
        .unwrap();

    let rendered = message.as_string().unwrap();
    let bounds = boundaries(&rendered);
    assert_eq!(bounds.len(), 1);
    let boundary = bounds[0];

    assert!(header_block(&rendered).contains("Content-Type: multipart/alternative;"));
    assert_eq!(rendered.matches(&format!("--{boundary}\r\n")).count(), 2);

    let plain = position(&rendered, "Content-Type: text/plain");
    let xhtml = position(&rendered, "Content-Type: application/xhtml+xml");
    let close = position(&rendered, &format!("--{boundary}--\r\n"));
    assert!(plain < xhtml);
    assert!(xhtml < close);

    let root = message.rendered().unwrap();
    let kinds: Vec<Option<String>> = root.children().iter().map(Part::mime_type).collect();
    assert_eq!(
        kinds,
        vec![
            Some("text/plain".to_string()),
            Some("application/xhtml+xml".to_string())
        ]
    );
}

#[test]
fn test_related_and_mixed_attachments() {
    let mut message = message_with_body("Attachments");

    let inline = Part::inline("text/plain", "Inline text", "inline.txt").unwrap();
    let first = Part::attachment("text/plain", "First attachment", "first.txt").unwrap();
    let second =
        Part::binary_attachment("application/octet-stream", vec![0u8, 1, 2, 3], "second.bin")
            .unwrap();

    message.add_body_related_attachment(inline).unwrap();
    message.add_attachment(first).unwrap();
    message.add_attachment(second).unwrap();

    let rendered = message.as_string().unwrap();
    let bounds = boundaries(&rendered);
    assert_eq!(bounds.len(), 2);
    let (mixed, related) = (bounds[0], bounds[1]);

    assert!(header_block(&rendered).contains("Content-Type: multipart/mixed;"));
    assert_eq!(rendered.matches(&format!("--{mixed}\r\n")).count(), 3);
    assert_eq!(rendered.matches(&format!("--{related}\r\n")).count(), 2);

    let order = [
        position(&rendered, "Content-Type: multipart/related"),
        position(&rendered, "Hello world"),
        position(&rendered, "filename=\"inline.txt\""),
        position(&rendered, &format!("--{related}--\r\n")),
        position(&rendered, "filename=\"first.txt\""),
        position(&rendered, "filename=\"second.bin\""),
        position(&rendered, "AAECAw=="),
        position(&rendered, &format!("--{mixed}--\r\n")),
    ];
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "{rendered}");

    let root = message.rendered().unwrap();
    assert_eq!(root.children().len(), 3);
    assert_eq!(root.children()[0].children().len(), 2);
    assert_eq!(root.children()[0].children()[0].kind(), PartKind::MessageBody);
    assert_eq!(root.children()[0].children()[1].kind(), PartKind::Inline);
}

#[test]
fn test_inline_image_is_referenced_by_content_id() {
    let mut message = message_with_body("Logo");

    let logo = Part::binary_inline("image/png", vec![0x89, b'P', b'N', b'G'], "logo.png").unwrap();
    let content_id = logo.content_id().unwrap().to_string();
    message
        .add_body(Part::body("text/html", format!("<img src=\"cid:{content_id}\">")).unwrap())
        .unwrap();
    message.add_body_related_attachment(logo).unwrap();

    let rendered = message.as_string().unwrap();
    assert!(rendered.contains(&format!("Content-ID: <{content_id}>\r\n")));
    assert!(rendered.contains(&format!("cid:{content_id}")));
    assert!(rendered.contains("Content-Disposition: inline; filename=\"logo.png\"\r\n"));
    assert!(rendered.contains("Content-Transfer-Encoding: base64\r\n"));
}

#[test]
fn test_set_header_first_write_wins() {
    let mut message = message_with_body("Headers");

    message.set_header("X-Test", Some("a")).unwrap();
    message.set_header("X-Test", Some("b")).unwrap();
    let rendered = message.as_string().unwrap();
    assert!(rendered.contains("X-Test: a\r\n"));
    assert!(!rendered.contains("X-Test: b\r\n"));

    message.set_header("X-Test", None).unwrap();
    message.set_header("X-Test", Some("b")).unwrap();
    let rendered = message.as_string().unwrap();
    assert!(rendered.contains("X-Test: b\r\n"));
    assert!(!rendered.contains("X-Test: a\r\n"));
}

#[test]
fn test_validation_errors() {
    init_tracing();
    let mut message = Message::new();

    let attachment = Part::attachment("text/plain", "Hello world", "hello.txt").unwrap();
    assert!(message.add_body(attachment).unwrap_err().is_invalid_argument());

    message.set_subject("No body");
    assert!(message.as_string().unwrap_err().is_invalid_state());

    let mut message = Message::new();
    message
        .add_body(Part::body("text/plain", "Hello world").unwrap())
        .unwrap();
    assert!(message.as_string().unwrap_err().is_invalid_state());

    message.set_subject("   ");
    assert!(message.as_string().unwrap_err().is_invalid_state());
}

#[test]
fn test_non_ascii_subject_is_encoded() {
    let mut message = message_with_body("We like German Umlauts to test UTF-8 öäü");
    let rendered = message.as_string().unwrap();

    assert!(rendered.contains(
        "Subject: =?utf-8?q?We_like_German_Umlauts_to_test_UTF-8_=C3=B6=C3=A4=C3=BC?=\r\n"
    ));
    assert!(!rendered.contains("öäü"));
}

#[test]
fn test_subject_with_specials_is_encoded() {
    let mut message = message_with_body("Re: meeting");
    let rendered = message.as_string().unwrap();
    assert!(rendered.contains("Subject: =?utf-8?q?Re=3A_meeting?=\r\n"));
}

#[test]
fn test_addresses() {
    let mut message = message_with_body("Addresses");

    assert!(message.set_to(["not-an-address"]).unwrap_err().is_invalid_argument());
    message.set_to(["Name <a@b.com>"]).unwrap();
    message.add_cc("cc@example.com").unwrap();
    message.add_bcc("hidden@example.com").unwrap();
    message.set_sender("Sender Name <sender@example.com>").unwrap();
    message.set_reply_to("reply@example.com").unwrap();

    let rendered = message.as_string().unwrap();
    let headers = header_block(&rendered);

    assert!(headers.contains(&format!("To: {}\r\n", format_address("Name", "a@b.com"))));
    assert!(headers.contains("From: Sender Name <sender@example.com>\r\n"));
    assert!(headers.contains("Cc: cc@example.com\r\n"));
    assert!(headers.contains("Reply-To: reply@example.com\r\n"));
    assert!(!rendered.contains("hidden@example.com"));
    assert_eq!(message.all_recipients().len(), 3);
}

#[test]
fn test_non_ascii_display_name() {
    let mut message = message_with_body("Names");
    message.add_to("Jörg <joerg@example.com>").unwrap();

    let rendered = message.as_string().unwrap();
    assert!(rendered.contains("To: =?utf-8?q?J=C3=B6rg?= <joerg@example.com>\r\n"));
}

#[test]
fn test_renders_are_independent() {
    let mut message = message_with_body("Twice");
    message
        .add_body(Part::body("text/html", "<p>Hello world</p>").unwrap())
        .unwrap();

    let first = message.as_string().unwrap();
    let second = message.as_string().unwrap();

    let (a, b) = (boundaries(&first)[0].to_string(), boundaries(&second)[0].to_string());
    assert_ne!(a, b);
    assert_eq!(first.replace(&a, "BOUNDARY"), second.replace(&b, "BOUNDARY"));
}

#[test]
fn test_lf_line_endings() {
    let mut message = message_with_body("Unix")
        .with_config(RenderConfig::new().with_line_ending(LineEnding::Lf));

    let rendered = message.as_string().unwrap();
    assert!(!rendered.contains('\r'));
    assert!(rendered.contains("Subject: Unix\n"));
    assert!(rendered.ends_with("\n\nHello world\n"));
}

#[test]
fn test_long_header_is_folded() {
    let mut message = message_with_body("Folding");
    let long = "word ".repeat(30);
    message.set_header("X-Long", Some(long.trim())).unwrap();

    let rendered = message.as_string().unwrap();
    for line in header_block(&rendered).split("\r\n") {
        assert!(line.len() <= 78, "{line}");
    }
    assert!(rendered.contains("X-Long: word word"));
}

#[test]
fn test_long_encoded_subject_is_folded() {
    let mut message = message_with_body(&"Grüße aus München, ".repeat(8));

    let rendered = message.as_string().unwrap();
    let headers = header_block(&rendered);
    for line in headers.split("\r\n") {
        assert!(line.len() <= 78, "{line}");
    }
    assert!(headers.contains("Subject:\r\n =?utf-8?q?"));
}

#[test]
fn test_header_injection_is_rejected() {
    let mut message = message_with_body("Injection");

    assert!(message
        .add_to("Evil\r\nBcc: victim@example.org <a@b.com>")
        .unwrap_err()
        .is_invalid_argument());
    assert!(message
        .set_sender("X\nInjected-Header: yes <s@b.com>")
        .unwrap_err()
        .is_invalid_argument());
    assert!(Part::body("text/plain; a=\"x\r\nBcc: v@e.org\"", "x")
        .unwrap_err()
        .is_invalid_argument());

    let rendered = message.as_string().unwrap();
    assert!(!rendered.contains("victim@example.org"));
    assert!(!rendered.contains("Injected-Header"));
}

proptest! {
    #[test]
    fn prop_subject_header_is_ascii(subject in "\\PC{1,40}") {
        prop_assume!(!subject.trim().is_empty());

        let mut message = message_with_body(&subject);
        let rendered = message.as_string().unwrap();

        prop_assert!(header_block(&rendered).is_ascii());
    }

    #[test]
    fn prop_safe_subject_passes_through(
        subject in "[A-Za-z0-9!#$%&'*+/=?^_`{|}~-][A-Za-z0-9 !#$%&'*+/=?^_`{|}~-]{0,39}"
    ) {
        let mut message = message_with_body(&subject);
        let rendered = message.as_string().unwrap();
        let expected = format!("Subject: {}\r\n", subject.trim());

        prop_assert!(rendered.contains(&expected));
    }
}
