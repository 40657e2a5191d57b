#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::TcpListener;

/// A response served by the `TestServer`.
#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Route {
            status: 200,
            content_type: content_type.into(),
            body,
        }
    }
}

/// A minimal HTTP server running on a background thread, answering each request with the route
/// registered for its path or with a 404.
pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    /// Binds to a free local port and serves the routes built by the closure, which receives the
    /// base URL of the server so that responses can point back to it.
    pub fn start<F>(build_routes: F) -> TestServer
    where
        F: FnOnce(&str) -> HashMap<String, Route>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes = build_routes(&base_url);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                // Skip the headers, requests carry no body
                loop {
                    let mut header_line = String::new();
                    match reader.read_line(&mut header_line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if header_line == "\r\n" => break,
                        Ok(_) => {}
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let route = routes.get(path).cloned().unwrap_or(Route {
                    status: 404,
                    content_type: "text/plain".into(),
                    body: b"not found".to_vec(),
                });
                let header = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    route.status,
                    if route.status == 200 { "OK" } else { "Not Found" },
                    route.content_type,
                    route.body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&route.body);
                let _ = stream.flush();
            }
        });

        TestServer { base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub fn png_bytes() -> Vec<u8> {
    encoded_image(image::ImageFormat::Png)
}

pub fn jpeg_bytes() -> Vec<u8> {
    encoded_image(image::ImageFormat::Jpeg)
}

fn encoded_image(image_format: image::ImageFormat) -> Vec<u8> {
    let image = image::RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
    let mut image_bytes = Cursor::new(Vec::new());
    image.write_to(&mut image_bytes, image_format).unwrap();
    image_bytes.into_inner()
}

/// Loads the PDF and returns, for every page in order, its decoded content operations.
pub fn page_operations(pdf_path: &std::path::Path) -> Vec<Vec<lopdf::content::Operation>> {
    let document = lopdf::Document::load(pdf_path).unwrap();
    document
        .get_pages()
        .values()
        .map(|page_id| {
            let content = document.get_page_content(*page_id).unwrap();
            lopdf::content::Content::decode(&content).unwrap().operations
        })
        .collect()
}

/// The strings shown on the page, decoded from `WinAnsiEncoding` for the ASCII range.
pub fn shown_text(operations: &[lopdf::content::Operation]) -> Vec<String> {
    operations
        .iter()
        .filter(|operation| operation.operator == "Tj")
        .map(|operation| match &operation.operands[0] {
            lopdf::Object::String(bytes, _) => bytes.iter().map(|byte| *byte as char).collect(),
            other => panic!("unexpected operand {:?}", other),
        })
        .collect()
}

pub fn count_operator(operations: &[lopdf::content::Operation], operator: &str) -> usize {
    operations
        .iter()
        .filter(|operation| operation.operator == operator)
        .count()
}
