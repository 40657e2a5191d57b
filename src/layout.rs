#![deny(clippy::unwrap_used, clippy::expect_used)]

use crate::fonts::BuiltinFont;

/// Width of an A4 page in millimeters.
pub const PAGE_WIDTH: f32 = 210.0;
/// Height of an A4 page in millimeters.
pub const PAGE_HEIGHT: f32 = 297.0;
pub const LEFT_MARGIN: f32 = 10.0;
pub const RIGHT_MARGIN: f32 = 10.0;
pub const TOP_MARGIN: f32 = 20.0;
pub const BOTTOM_MARGIN: f32 = 20.0;
pub const IMAGE_WIDTH: f32 = 30.0;
pub const IMAGE_HEIGHT: f32 = 30.0;
/// Horizontal position where the text block of every card begins.
pub const TEXT_LEFT_MARGIN: f32 = LEFT_MARGIN + IMAGE_WIDTH + 5.0;
pub const CONTACTS_PER_PAGE: usize = 5;
/// Height of the slot reserved to every card.
pub const CONTACT_HEIGHT: f32 =
    (PAGE_HEIGHT - TOP_MARGIN - BOTTOM_MARGIN) / CONTACTS_PER_PAGE as f32;
pub const LINE_HEIGHT: f32 = 5.0;
/// Horizontal padding between the edge of a text cell and its text.
pub const CELL_PADDING: f32 = 1.0;
/// Distance of the separator line from the bottom of its slot.
pub const SEPARATOR_OFFSET: f32 = 2.0;
pub const SEPARATOR_WIDTH: f32 = 0.2;
/// Margin used on the title page, which does not follow the card grid.
pub const TITLE_MARGIN: f32 = 10.0;
/// Width of the box the description is wrapped into.
pub const DESCRIPTION_WIDTH: f32 = PAGE_WIDTH - TEXT_LEFT_MARGIN - RIGHT_MARGIN;
/// Number of characters of the description which are kept before the ellipsis.
pub const DESCRIPTION_LIMIT: usize = 500;

/// Converts millimeters to points, which is the unit expected by the PDF specification.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 72.0 / 25.4
}

/// Converts points to millimeters.
pub fn points_to_millimeters(points: f32) -> f32 {
    points * 25.4 / 72.0
}

/// The position of a record (1-based index) on the contact sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotPosition {
    /// The 1-based number of the content page, the title page excluded.
    pub content_page: usize,
    /// The 0-based vertical slot on the page.
    pub slot: usize,
}

impl SlotPosition {
    pub fn of_record(record_index: usize) -> Self {
        debug_assert!(record_index >= 1, "records are numbered from 1");
        let zero_based_index = record_index.saturating_sub(1);
        SlotPosition {
            content_page: zero_based_index / CONTACTS_PER_PAGE + 1,
            slot: zero_based_index % CONTACTS_PER_PAGE,
        }
    }

    /// Whether the record opens a new content page.
    pub fn starts_page(&self) -> bool {
        self.slot == 0
    }

    /// Distance of the slot from the top edge of the page.
    pub fn top(&self) -> f32 {
        TOP_MARGIN + self.slot as f32 * CONTACT_HEIGHT
    }

    /// The last slot on a page has no separator below it.
    pub fn has_separator(&self) -> bool {
        self.slot < CONTACTS_PER_PAGE - 1
    }

    pub fn separator_y(&self) -> f32 {
        self.top() + CONTACT_HEIGHT - SEPARATOR_OFFSET
    }
}

/// Number of content pages needed for the given number of records.
pub fn content_page_count(records: usize) -> usize {
    records.div_ceil(CONTACTS_PER_PAGE)
}

/// Vertical position of the baseline of a line of text, written in a cell whose top edge is at
/// `cell_top` and whose height is `cell_height`, both measured from the top of the page.
pub fn baseline_in_cell(cell_top: f32, cell_height: f32, font_size: f32) -> f32 {
    cell_top + cell_height / 2.0 + 0.3 * points_to_millimeters(font_size)
}

/// Cuts the description to its first `DESCRIPTION_LIMIT` characters and appends the ellipsis.
pub fn truncate_description(description: &str) -> String {
    let mut truncated: String = description.chars().take(DESCRIPTION_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

/// Wraps the text into lines which fit into `maximum_width` millimeters once written in the given
/// font. Lines are broken between words, words wider than a line are broken between characters
/// and newlines always start a new line.
pub fn wrap_text(text: &str, font: BuiltinFont, font_size: f32, maximum_width: f32) -> Vec<String> {
    let width_of = |string: &str| points_to_millimeters(font.text_width(string, font_size));
    let space_width = width_of(" ");
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width: f32 = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = width_of(word);

            if word_width > maximum_width {
                if !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                }
                let mut chunk = String::new();
                let mut chunk_width: f32 = 0.0;
                for character in word.chars() {
                    let mut buffer = [0; 4];
                    let character_width = width_of(&*character.encode_utf8(&mut buffer));
                    if chunk_width + character_width > maximum_width && !chunk.is_empty() {
                        lines.push(std::mem::take(&mut chunk));
                        chunk_width = 0.0;
                    }
                    chunk.push(character);
                    chunk_width += character_width;
                }
                current_line = chunk;
                current_width = chunk_width;
                continue;
            }

            if current_line.is_empty() {
                current_line = word.to_string();
                current_width = word_width;
            } else if current_width + space_width + word_width <= maximum_width {
                current_line.push(' ');
                current_line.push_str(word);
                current_width += space_width + word_width;
            } else {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
                current_width = word_width;
            }
        }

        // Empty paragraphs still take up a line
        lines.push(current_line);
    }

    lines
}
