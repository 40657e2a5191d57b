#![deny(clippy::unwrap_used, clippy::expect_used)]

use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;

/// The fonts of the standard PDF base-14 set which are used by the contact sheet.
///
/// These fonts are never embedded: every PDF viewer is required to provide them, which is why
/// only their advance widths need to be known in order to measure and wrap text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl BuiltinFont {
    /// The PostScript name of the font, as it must appear in the `BaseFont` entry.
    pub fn base_font_name(&self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
            BuiltinFont::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// Advance width of a WinAnsi-encoded byte, in thousandths of the font size.
    fn glyph_width(&self, byte: u8) -> u16 {
        let widths = match self {
            // The oblique face is the regular one slanted, its metrics are the same
            BuiltinFont::Helvetica | BuiltinFont::HelveticaOblique => &HELVETICA_WIDTHS,
            BuiltinFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            32..=255 => widths[(byte - 32) as usize],
            _ => 0,
        }
    }

    /// Width of the already-encoded text in points, for the given font size in points.
    pub fn encoded_width(&self, encoded_text: &[u8], font_size: f32) -> f32 {
        let units: u32 = encoded_text
            .iter()
            .map(|byte| self.glyph_width(*byte) as u32)
            .sum();
        units as f32 * font_size / 1000.0
    }

    /// Width of the text in points. Characters which cannot be encoded are measured as a space,
    /// the error itself is reported when the text is actually written.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let encoded_text: Vec<u8> = text
            .nfc()
            .map(|character| encode_character(character).unwrap_or(b' '))
            .collect();
        self.encoded_width(&encoded_text, font_size)
    }
}

/// Encodes the text in the WinAnsiEncoding expected by the base-14 fonts, after normalizing it
/// in the NFC form. Fails on the first character which has no representation in the encoding.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, ContextError> {
    text.nfc()
        .map(|character| {
            encode_character(character).ok_or(ContextError::with_context(format!(
                "The character {:?} (U+{:04X}) cannot be represented with the built-in fonts",
                character, character as u32
            )))
        })
        .collect()
}

fn encode_character(character: char) -> Option<u8> {
    let codepoint = character as u32;
    match codepoint {
        0x20..=0x7E | 0xA0..=0xFF => Some(codepoint as u8),
        // Tabs are drawn as plain spaces
        0x09 => Some(b' '),
        _ => match character {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '\u{2018}' => Some(0x91),
            '\u{2019}' => Some(0x92),
            '\u{201C}' => Some(0x93),
            '\u{201D}' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}

// Advance widths for the bytes 32 to 255 in WinAnsiEncoding, taken from the Adobe font metrics.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 224] = [
    // 32..=63
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    // 64..=95
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    // 96..=127
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 350,
    // 128..=159
    556, 350, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350,
    350, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 350, 500, 667,
    // 160..=191
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    // 192..=223
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    // 224..=255
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 224] = [
    // 32..=63
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    // 64..=95
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    // 96..=127
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 350,
    // 128..=159
    556, 350, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350,
    350, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 350, 500, 667,
    // 160..=191
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    // 192..=223
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    // 224..=255
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];
