#![deny(clippy::unwrap_used, clippy::expect_used)]

use lopdf::content::Operation;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::error::ContextError;
use crate::fonts::BuiltinFont;
use crate::layout::{
    baseline_in_cell, points_to_millimeters, wrap_text, SlotPosition, CELL_PADDING,
    DESCRIPTION_WIDTH, IMAGE_HEIGHT, IMAGE_WIDTH, LEFT_MARGIN, LINE_HEIGHT, PAGE_HEIGHT,
    PAGE_WIDTH, RIGHT_MARGIN, SEPARATOR_WIDTH, TEXT_LEFT_MARGIN, TITLE_MARGIN,
};
use crate::pdf::{image_operations, line_operations, ImageXObject, PdfDocument, XObjectReference};
use crate::person::PersonRecord;

const TEXT_COLOR: [f32; 3] = [0.0, 0.0, 0.0];
const TITLE_FONT_SIZE: f32 = 8.0;
const NAME_FONT_SIZE: f32 = 14.0;
const LOCATION_FONT_SIZE: f32 = 12.0;
const PHONE_FONT_SIZE: f32 = 10.0;
const DESCRIPTION_FONT_SIZE: f32 = 8.0;

/// What happened to the picture of a card which was rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    /// The picture was drawn in the image box.
    Placed(PathBuf),
    /// The card was rendered without picture, for the given reason.
    Unavailable(String),
}

/// Lays out the contact sheet: the title page first, then one card per person, five cards per page.
///
/// The builder keeps track of the current content page. Every card is first turned into a list of
/// operations and only added to the page once all of them could be built, so a card which fails
/// to render leaves no trace on the page.
pub struct ContactSheetBuilder {
    pdf_document: PdfDocument,
    regular_font: usize,
    bold_font: usize,
    oblique_font: usize,
    /// Page and layer index of the content page being filled.
    current_page: Option<(usize, usize)>,
    content_pages: usize,
}

impl ContactSheetBuilder {
    pub fn new<S: Into<String>>(document_identifier: S) -> Self {
        let mut pdf_document = PdfDocument::new(document_identifier);
        pdf_document.title = "Contacts".into();
        let regular_font = pdf_document.add_font(BuiltinFont::Helvetica);
        let bold_font = pdf_document.add_font(BuiltinFont::HelveticaBold);
        let oblique_font = pdf_document.add_font(BuiltinFont::HelveticaOblique);

        ContactSheetBuilder {
            pdf_document,
            regular_font,
            bold_font,
            oblique_font,
            current_page: None,
            content_pages: 0,
        }
    }

    /// Adds the title page, which only carries the generation date in its top-right corner.
    pub fn add_title_page(&mut self, generated_at: &OffsetDateTime) -> Result<(), ContextError> {
        let (page_index, layer_index) = self
            .pdf_document
            .add_page_with_layer(PAGE_WIDTH, PAGE_HEIGHT);

        let title = format!("Generated on: {}", format_generation_date(generated_at));
        let title_width = points_to_millimeters(
            BuiltinFont::HelveticaOblique.text_width(&title, TITLE_FONT_SIZE),
        );
        let x = PAGE_WIDTH - TITLE_MARGIN - CELL_PADDING - title_width;
        let baseline = baseline_in_cell(TITLE_MARGIN, LINE_HEIGHT, TITLE_FONT_SIZE);
        let operations = self.pdf_document.text_operations(
            self.oblique_font,
            TITLE_FONT_SIZE,
            TEXT_COLOR,
            &title,
            [x, PAGE_HEIGHT - baseline],
        )?;

        self.pdf_document
            .add_operations_to_layer_in_page(layer_index, page_index, operations)
    }

    /// Lays out the card of the record with the given 1-based index. A new content page is
    /// started for the first slot of every page, before anything else can fail.
    ///
    /// A picture which cannot be loaded does not prevent the card from being rendered, while any
    /// failure in rendering the text skips the whole card.
    pub fn add_person(
        &mut self,
        record_index: usize,
        person: &PersonRecord,
        image_path: Option<&Path>,
    ) -> Result<ImageOutcome, ContextError> {
        let position = SlotPosition::of_record(record_index);
        let (page_index, layer_index) = self.page_of_record(record_index)?;
        let slot_top = position.top();

        let mut operations = Vec::new();
        let mut pending_image = None;
        let image_outcome = match image_path {
            Some(image_path) => match ImageXObject::from_path(image_path) {
                Ok(image) => {
                    let reference = XObjectReference::new(record_index);
                    operations.extend(image_operations(
                        &reference,
                        [LEFT_MARGIN, PAGE_HEIGHT - slot_top - IMAGE_HEIGHT],
                        [IMAGE_WIDTH, IMAGE_HEIGHT],
                    ));
                    pending_image = Some((reference, image));
                    ImageOutcome::Placed(image_path.to_path_buf())
                }
                Err(error) => {
                    log::error!("Error adding image to PDF: {}", error);
                    ImageOutcome::Unavailable(error.to_string())
                }
            },
            None => ImageOutcome::Unavailable("No picture was downloaded".into()),
        };

        let mut cell_top = slot_top;
        for (font_index, font_size, text) in [
            (self.bold_font, NAME_FONT_SIZE, person.name()),
            (self.bold_font, LOCATION_FONT_SIZE, person.location()),
            (self.regular_font, PHONE_FONT_SIZE, person.phone_line()),
        ] {
            operations.extend(self.cell_operations(font_index, font_size, &text, cell_top)?);
            cell_top += LINE_HEIGHT;
        }

        let description_lines = wrap_text(
            &person.description(),
            BuiltinFont::Helvetica,
            DESCRIPTION_FONT_SIZE,
            DESCRIPTION_WIDTH - 2.0 * CELL_PADDING,
        );
        for line in &description_lines {
            if !line.is_empty() {
                operations.extend(self.cell_operations(
                    self.regular_font,
                    DESCRIPTION_FONT_SIZE,
                    line,
                    cell_top,
                )?);
            }
            cell_top += LINE_HEIGHT;
        }

        if position.has_separator() {
            let separator_y = PAGE_HEIGHT - position.separator_y();
            operations.extend(line_operations(
                [LEFT_MARGIN, separator_y],
                [PAGE_WIDTH - RIGHT_MARGIN, separator_y],
                SEPARATOR_WIDTH,
            ));
        }

        if let Some((reference, image)) = pending_image {
            self.pdf_document
                .add_image_to_page(page_index, reference, image)?;
            log::debug!("Added the image of person {} to the PDF", record_index);
        }
        self.pdf_document
            .add_operations_to_layer_in_page(layer_index, page_index, operations)?;

        Ok(image_outcome)
    }

    /// Number of pages started for the cards, the title page excluded.
    pub fn content_pages(&self) -> usize {
        self.content_pages
    }

    /// Writes everything into the underlying PDF document and returns it, ready to be saved.
    pub fn finish(
        mut self,
        instance_id: String,
        creation_date: &OffsetDateTime,
    ) -> Result<PdfDocument, ContextError> {
        self.pdf_document.write_all(instance_id, creation_date)?;
        self.pdf_document.optimize();

        Ok(self.pdf_document)
    }

    /// Returns the page and layer index of the content page holding the record with the given
    /// 1-based index, starting new pages as needed. Records are expected in increasing order.
    pub fn page_of_record(&mut self, record_index: usize) -> Result<(usize, usize), ContextError> {
        if record_index == 0 {
            return Err(ContextError::with_context("Records are numbered from 1"));
        }
        let position = SlotPosition::of_record(record_index);
        while self.content_pages < position.content_page {
            self.current_page = Some(
                self.pdf_document
                    .add_page_with_layer(PAGE_WIDTH, PAGE_HEIGHT),
            );
            self.content_pages += 1;
        }

        match self.current_page {
            Some(current_page) if self.content_pages == position.content_page => Ok(current_page),
            _ => Err(ContextError::with_context(format!(
                "Record {} belongs to a page which was already completed",
                record_index
            ))),
        }
    }

    /// Operations for a single-line text cell of the text column, measured from the top of the page.
    fn cell_operations(
        &self,
        font_index: usize,
        font_size: f32,
        text: &str,
        cell_top: f32,
    ) -> Result<Vec<Operation>, ContextError> {
        let baseline = baseline_in_cell(cell_top, LINE_HEIGHT, font_size);
        self.pdf_document.text_operations(
            font_index,
            font_size,
            TEXT_COLOR,
            text,
            [TEXT_LEFT_MARGIN + CELL_PADDING, PAGE_HEIGHT - baseline],
        )
    }
}

/// Formats the date as `YYYY-MM-DD HH:MM:SS`.
pub fn format_generation_date(date: &OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
    )
}
