mod common;

use common::{count_operator, jpeg_bytes, page_operations, png_bytes, shown_text, Route, TestServer};
use contact_sheet::{
    configuration::RunConfiguration,
    contact_sheet::ImageOutcome,
    fetcher::{ImageFetcher, WrapperEndpoint},
    person::PeopleDocument,
    pipeline::{generate_contact_sheet, RecordOutcome, RunSummary},
};
use std::collections::HashMap;
use time::macros::datetime;

fn run_pipeline(
    people_json: &str,
    fetcher: &ImageFetcher,
) -> (tempfile::TempDir, RunConfiguration, RunSummary) {
    let output_root = tempfile::tempdir().unwrap();
    let run = RunConfiguration::started_at(output_root.path(), datetime!(2024-06-15 14:30:45 UTC))
        .unwrap();
    run.create_directories().unwrap();
    let people_document = PeopleDocument::from_json(people_json).unwrap();

    let run_summary = generate_contact_sheet(&people_document, &run, fetcher).unwrap();

    (output_root, run, run_summary)
}

fn picture_server() -> TestServer {
    TestServer::start(|_| {
        HashMap::from([
            ("/photo.jpg".to_string(), Route::ok("image/jpeg", jpeg_bytes())),
            ("/photo.png".to_string(), Route::ok("image/png", png_bytes())),
            ("/page.html".to_string(), Route::ok("text/html", b"<html></html>".to_vec())),
        ])
    })
}

#[test]
fn six_people_fill_two_content_pages() {
    let server = picture_server();
    let people: Vec<String> = (1..=6)
        .map(|index| {
            let path = if index % 2 == 0 { "/photo.png" } else { "/photo.jpg" };
            format!(
                r#"{{ "name": "Person {}", "location": "City", "phone": "555-000{}", "description": "Card number {}", "image": "{}" }}"#,
                index,
                index,
                index,
                server.url(path)
            )
        })
        .collect();
    let people_json = format!(r#"{{ "people": [ {} ] }}"#, people.join(", "));

    let (_output_root, run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    assert_eq!(run_summary.content_pages, 2);
    assert_eq!(run_summary.rendered(), 6);
    assert_eq!(run_summary.with_image(), 6);
    for index in 1..=6 {
        assert!(run.image_path(index).is_file(), "missing picture {}", index);
    }

    let pages = page_operations(&run_summary.pdf_path);
    assert_eq!(pages.len(), 3);
    similar_asserts::assert_eq!(
        shown_text(&pages[0]),
        vec!["Generated on: 2024-06-15 14:30:45".to_string()]
    );
    assert_eq!(count_operator(&pages[0], "Do"), 0);
    assert_eq!(count_operator(&pages[1], "Do"), 5);
    assert_eq!(count_operator(&pages[2], "Do"), 1);
    // Separators below the first four slots only
    assert_eq!(count_operator(&pages[1], "S"), 4);
    assert_eq!(count_operator(&pages[2], "S"), 1);

    similar_asserts::assert_eq!(
        shown_text(&pages[2]),
        vec![
            "Person 6".to_string(),
            "City".to_string(),
            "Phone: 555-0006".to_string(),
            "Card number 6...".to_string(),
        ]
    );
}

/// Converts a coordinate read from the page content to millimeters from the top of the page.
fn millimeters_from_top(operand: &lopdf::Object) -> f32 {
    297.0 - operand.as_float().unwrap() * 25.4 / 72.0
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "{:?} != {:?}", actual, expected);
    for (actual_value, expected_value) in actual.iter().zip(expected) {
        assert!(
            (actual_value - expected_value).abs() < 0.01,
            "{:?} != {:?}",
            actual,
            expected
        );
    }
}

/// Bottom edge of the picture, baseline of the name and separator of every card on the page,
/// measured from the top of the page.
fn card_geometry(operations: &[lopdf::content::Operation]) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let mut image_bottoms = Vec::new();
    let mut name_baselines = Vec::new();
    let mut separators = Vec::new();
    let mut caret_y = None;
    for operation in operations {
        match operation.operator.as_str() {
            "cm" => image_bottoms.push(millimeters_from_top(&operation.operands[5])),
            "m" => separators.push(millimeters_from_top(&operation.operands[1])),
            "Td" => caret_y = Some(millimeters_from_top(&operation.operands[1])),
            "Tj" => {
                if shown_text(std::slice::from_ref(operation))[0].starts_with("Person ") {
                    name_baselines.extend(caret_y);
                }
            }
            _ => {}
        }
    }
    (image_bottoms, name_baselines, separators)
}

#[test]
fn cards_are_stacked_from_the_top_of_the_page() {
    let server = picture_server();
    let people: Vec<String> = (1..=6)
        .map(|index| {
            format!(
                r#"{{ "name": "Person {}", "image": "{}" }}"#,
                index,
                server.url("/photo.jpg")
            )
        })
        .collect();
    let people_json = format!(r#"{{ "people": [ {} ] }}"#, people.join(", "));

    let (_output_root, _run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    let pages = page_operations(&run_summary.pdf_path);
    // Slots start 20 mm from the top and are 51.4 mm high, pictures are 30 mm high and the
    // baseline of the 14 pt name sits 2.5 mm plus 30% of the font size below the slot top
    let slot_tops: [f32; 5] = [20.0, 71.4, 122.8, 174.2, 225.6];
    let name_offset: f32 = 2.5 + 0.3 * 14.0 * 25.4 / 72.0;

    let (image_bottoms, name_baselines, separators) = card_geometry(&pages[1]);
    assert_close(&image_bottoms, &slot_tops.map(|top| top + 30.0));
    assert_close(&name_baselines, &slot_tops.map(|top| top + name_offset));
    assert_close(&separators, &[69.4, 120.8, 172.2, 223.6]);

    let (image_bottoms, name_baselines, separators) = card_geometry(&pages[2]);
    assert_close(&image_bottoms, &[50.0]);
    assert_close(&name_baselines, &[20.0 + name_offset]);
    assert_close(&separators, &[69.4]);
}

#[test]
fn missing_fields_render_their_fallbacks() {
    let server = picture_server();
    let people_json = format!(
        r#"{{ "people": [ {{ "image": "{}" }} ] }}"#,
        server.url("/photo.jpg")
    );

    let (_output_root, _run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    let pages = page_operations(&run_summary.pdf_path);
    similar_asserts::assert_eq!(
        shown_text(&pages[1]),
        vec![
            "Name not specified".to_string(),
            "Location not specified".to_string(),
            "Phone: Phone not specified".to_string(),
            "No description available...".to_string(),
        ]
    );
}

#[test]
fn long_descriptions_are_truncated() {
    let server = picture_server();
    let description = "abcdefghij".repeat(60);
    let people_json = format!(
        r#"{{ "people": [ {{ "name": "Ada", "description": "{}", "image": "{}" }} ] }}"#,
        description,
        server.url("/photo.jpg")
    );

    let (_output_root, _run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    let pages = page_operations(&run_summary.pdf_path);
    let description_text = shown_text(&pages[1])[3..].concat();
    assert_eq!(description_text.chars().count(), 503);
    assert_eq!(description_text, format!("{}...", &description[..500]));
}

#[test]
fn non_image_responses_render_the_card_without_picture() {
    let server = picture_server();
    let people_json = format!(
        r#"{{ "people": [ {{ "name": "Ada", "location": "London", "image": "{}" }} ] }}"#,
        server.url("/page.html")
    );

    let (_output_root, run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    match &run_summary.outcomes[0] {
        RecordOutcome::Rendered {
            index: 1,
            image: ImageOutcome::Unavailable(reason),
        } => assert!(reason.contains("Invalid content type"), "{}", reason),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(!run.image_path(1).exists());

    let pages = page_operations(&run_summary.pdf_path);
    assert_eq!(count_operator(&pages[1], "Do"), 0);
    assert_eq!(shown_text(&pages[1])[..2], ["Ada".to_string(), "London".to_string()]);
}

#[test]
fn wrapper_endpoints_are_followed_to_the_picture() {
    let server = TestServer::start(|base_url| {
        let wrapper_body = format!(
            r#"{{ "message": "{}/photo.jpg", "status": "success" }}"#,
            base_url
        );
        HashMap::from([
            (
                "/api/breeds/image/random".to_string(),
                Route::ok("application/json", wrapper_body.into_bytes()),
            ),
            (
                "/api/empty".to_string(),
                Route::ok("application/json", br#"{ "status": "success" }"#.to_vec()),
            ),
            ("/photo.jpg".to_string(), Route::ok("image/jpeg", jpeg_bytes())),
        ])
    });
    let fetcher = ImageFetcher::new()
        .unwrap()
        .with_wrapper_endpoints(vec![WrapperEndpoint::new("127.0.0.1", "/api/")]);
    let people_json = format!(
        r#"{{ "people": [ {{ "name": "Rex", "image": "{}" }}, {{ "name": "Fido", "image": "{}" }} ] }}"#,
        server.url("/api/breeds/image/random"),
        server.url("/api/empty")
    );

    let (_output_root, run, run_summary) = run_pipeline(&people_json, &fetcher);

    assert_eq!(std::fs::read(run.image_path(1)).unwrap(), jpeg_bytes());
    assert!(matches!(
        run_summary.outcomes[0],
        RecordOutcome::Rendered {
            image: ImageOutcome::Placed(_),
            ..
        }
    ));
    match &run_summary.outcomes[1] {
        RecordOutcome::Rendered {
            image: ImageOutcome::Unavailable(reason),
            ..
        } => assert!(reason.contains("has no message"), "{}", reason),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn failed_status_codes_keep_the_record() {
    let server = picture_server();
    let people_json = format!(
        r#"{{ "people": [ {{ "name": "Ada", "image": "{}" }} ] }}"#,
        server.url("/missing.jpg")
    );

    let (_output_root, _run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    assert_eq!(run_summary.rendered(), 1);
    assert_eq!(run_summary.with_image(), 0);
}

#[test]
fn unencodable_records_are_skipped_but_keep_their_slot() {
    let server = picture_server();
    let people_json = format!(
        r#"{{ "people": [
            {{ "name": "Ada", "image": "{0}" }},
            {{ "name": "Алексей", "image": "{0}" }},
            {{ "name": "Cleo", "image": "{0}" }},
            {{ "name": "Dora", "image": "{0}" }},
            {{ "name": "Emil", "image": "{0}" }},
            {{ "name": "Finn", "image": "{0}" }}
        ] }}"#,
        server.url("/photo.jpg")
    );

    let (_output_root, _run, run_summary) = run_pipeline(&people_json, &ImageFetcher::new().unwrap());

    assert_eq!(run_summary.rendered(), 5);
    assert_eq!(run_summary.skipped(), 1);
    assert!(matches!(
        &run_summary.outcomes[1],
        RecordOutcome::Skipped { index: 2, reason } if reason.contains("U+0410")
    ));
    let pages = page_operations(&run_summary.pdf_path);
    assert_eq!(pages.len(), 3);
    assert_eq!(count_operator(&pages[1], "Do"), 4);
    assert_eq!(shown_text(&pages[2])[0], "Finn");
}

#[test]
fn empty_documents_only_have_the_title_page() {
    let (_output_root, _run, run_summary) =
        run_pipeline(r#"{ "people": [] }"#, &ImageFetcher::new().unwrap());

    assert_eq!(run_summary.content_pages, 0);
    assert_eq!(page_operations(&run_summary.pdf_path).len(), 1);
}
