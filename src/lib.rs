//! contact-sheet turns a JSON list of people into a printable PDF contact sheet.
//!
//! Every person of the list gets a card made of a picture, downloaded from the URL found in the
//! record, and a block of text with the name, location, phone number and description. Cards are laid
//! out in five fixed slots per A4 page, after a title page carrying the date of generation.
//!
//! The whole run is sequential: records are processed one after the other in the order of the
//! document, and the failure of a single record never aborts the run, it is reported in the
//! `RunSummary` instead.

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The `ContextError` type carries a message describing what was being done when the error happened,
/// and optionally the message of the error which caused it. It implements `std::fmt::Display` so that
/// it can be printed out as a single line.
pub mod error;

/// The built-in Helvetica fonts of the PDF format, with their metrics and the `WinAnsiEncoding`
/// used to write text with them.
pub mod fonts;

/// The constants of the page layout, in millimeters, together with the arithmetic placing every
/// record on its page and the wrapping of text into boxes of fixed width.
pub mod layout;

/// The people document read as input and its records.
pub mod person;

/// Download of the pictures of the people over HTTP.
///
/// # Wrapper endpoints
///
/// Some image providers do not serve a picture but a small JSON document naming the URL of one, such
/// as the random dog pictures API. The `ImageFetcher` recognizes these endpoints and follows the URL
/// found in the `message` field of their response.
pub mod fetcher;

/// The module where the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. It offers convenience functions
/// such as `add_page_with_layer`, `add_font`, `text_operations`, `add_image_to_page`, `write_all`
/// and `save_to_bytes`, which let the caller build pages out of operations while the details of the
/// underlying `lopdf` objects are kept hidden.
///
/// Operations are built first and added to a page afterwards, so that a caller can discard them if
/// something goes wrong halfway.
pub mod pdf;

/// The `ContactSheetBuilder`, which lays out the title page and the card of every person.
pub mod contact_sheet;

/// The `RunConfiguration`, holding the timestamp of the run and the paths derived from it.
pub mod configuration;

/// Installation of the logger writing both to the console and to the log file of the run.
pub mod logging;

/// The loop going through the people document, from the download of the pictures to the saved PDF.
pub mod pipeline;
