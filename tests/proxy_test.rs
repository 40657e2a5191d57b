mod common;

use common::{jpeg_bytes, Route, TestServer};
use contact_sheet::fetcher::ImageFetcher;
use std::collections::HashMap;

// Kept in its own test binary, the proxy variables would leak into the other tests otherwise
#[test]
fn proxy_variables_are_ignored() {
    for variable in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
        // Nothing listens on the discard port
        std::env::set_var(variable, "http://127.0.0.1:9");
    }
    std::env::remove_var("NO_PROXY");
    std::env::remove_var("no_proxy");
    let server = TestServer::start(|_| {
        HashMap::from([("/photo.jpg".to_string(), Route::ok("image/jpeg", jpeg_bytes()))])
    });
    let directory = tempfile::tempdir().unwrap();
    let target_path = directory.path().join("person_1.jpg");

    let fetcher = ImageFetcher::new().unwrap();
    let image_path = fetcher
        .fetch_image(&server.url("/photo.jpg"), &target_path)
        .unwrap();

    assert_eq!(std::fs::read(image_path).unwrap(), jpeg_bytes());
}
