#![deny(clippy::unwrap_used, clippy::expect_used)]

use image::ImageFormat;
use lopdf::{content::Operation, Object, ObjectId, StringFormat};
use std::{
    collections::BTreeMap,
    io::BufWriter,
    mem,
    path::{Path, PathBuf},
};
use time::OffsetDateTime;

use crate::error::ContextError;
use crate::fonts::{encode_win_ansi, BuiltinFont};
use crate::layout::millimeters_to_points;

/// One layer of PDF data. It is converted into a `lopdf::Stream` when the document is written.
#[derive(Debug, Clone)]
pub struct PdfLayer {
    /// Name of the layer, only used for diagnostics.
    pub(crate) name: String,
    /// Content operations of this layer, in drawing order.
    pub(crate) operations: Vec<Operation>,
}

impl PdfLayer {
    /// Encodes the operations of the layer, isolated in their own graphics state block, into
    /// an uncompressed stream.
    fn to_stream(&self) -> Result<lopdf::Stream, ContextError> {
        let mut operations = Vec::with_capacity(self.operations.len() + 2);
        // In the PDF specification the q/Q operators delimit an isolated graphics state block
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.operations.iter().cloned());
        operations.push(Operation::new("Q", vec![]));

        let stream_content = lopdf::content::Content { operations }
            .encode()
            .map_err(|error| {
                ContextError::with_error(
                    format!("Failed to encode the content of the layer {:?}", self.name),
                    &error,
                )
            })?;

        Ok(lopdf::Stream::new(lopdf::Dictionary::new(), stream_content))
    }
}

/// The low-level image representation for a PDF document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Either `DeviceRGB` or `DeviceGray`.
    pub color_space: &'static str,
    pub bits_per_component: u8,
    /// The filter the image data is already encoded with, `DCTDecode` for JPEG data which is
    /// embedded as it is. Raw samples have no filter.
    pub filter: Option<&'static str>,
    /// The actual data from the image.
    pub image_data: Vec<u8>,
}

impl ImageXObject {
    /// Builds the image from the bytes of an encoded picture. JPEG pictures with three or one
    /// components are embedded untouched, everything else (CMYK JPEG included) is decoded to
    /// 8-bit RGB samples.
    pub fn from_bytes(image_bytes: &[u8]) -> Result<Self, ContextError> {
        let image_format = image::guess_format(image_bytes).map_err(|error| {
            ContextError::with_error("Unable to recognize the image format", &error)
        })?;
        let image = image::load_from_memory_with_format(image_bytes, image_format)
            .map_err(|error| ContextError::with_error("Unable to decode the image", &error))?;
        let (width, height) = (image.width(), image.height());

        let image_xobject = match passthrough_color_space(image_format, image_bytes) {
            Some(color_space) => ImageXObject {
                width,
                height,
                color_space,
                bits_per_component: 8,
                filter: Some("DCTDecode"),
                image_data: image_bytes.to_vec(),
            },
            None => ImageXObject {
                width,
                height,
                color_space: "DeviceRGB",
                bits_per_component: 8,
                filter: None,
                image_data: image.to_rgb8().into_raw(),
            },
        };

        Ok(image_xobject)
    }

    pub fn from_path(image_path: &Path) -> Result<Self, ContextError> {
        let image_bytes = std::fs::read(image_path).map_err(|error| {
            ContextError::with_error(format!("Unable to read the image {:?}", image_path), &error)
        })?;
        Self::from_bytes(&image_bytes).map_err(|error| ContextError {
            context: format!("{} {:?}", error.context, image_path),
            source_error: error.source_error,
        })
    }

    fn to_stream(&self) -> lopdf::Stream {
        use lopdf::Object::*;

        let mut dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(self.width as i64)),
            ("Height", Integer(self.height as i64)),
            ("ColorSpace", Name(self.color_space.into())),
            ("BitsPerComponent", Integer(self.bits_per_component as i64)),
        ]);
        match self.filter {
            Some(filter) => {
                dictionary.set("Filter", Name(filter.into()));
                // Already-encoded data must not be compressed a second time
                lopdf::Stream::new(dictionary, self.image_data.clone()).with_compression(false)
            }
            None => lopdf::Stream::new(dictionary, self.image_data.clone()),
        }
    }
}

/// Named reference to an image `XObject`, as it is used by the `Do` operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("Im{index}"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The representation of a PDF page, measured in points.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Page layers.
    pub layers: Vec<PdfLayer>,
    /// Images drawn on the page, by the name they are referenced with.
    pub(crate) xobjects: BTreeMap<XObjectReference, ImageXObject>,
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the
/// underlying `lopdf::Document` with the addition of the pages, the document ID and the fonts used.
///
/// Positions and sizes taken by its methods are expressed in millimeters, with the origin in the
/// bottom-left corner of the page as in the PDF specification.
pub struct PdfDocument {
    /// The registered fonts with their object IDs, the index is used for the resource name.
    fonts: Vec<(ObjectId, BuiltinFont)>,
    /// The underlying PDF document, exposed for whoever needs to reach beyond this interface.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The title written into the document information dictionary.
    pub title: String,
    /// The pages of the PDF document.
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` with version 1.5 of the PDF specification and the given identifier.
    pub fn new<S: Into<String>>(pdf_document_identifier: S) -> Self {
        PdfDocument {
            fonts: Vec::new(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier.into(),
            title: "Untitled".into(),
            pages: Vec::new(),
        }
    }

    /// Adds a page of given width and height in millimeters with an empty layer, returning the
    /// index of the page and of the layer in the page.
    pub fn add_page_with_layer(&mut self, page_width: f32, page_height: f32) -> (usize, usize) {
        let pdf_page = PdfPage {
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            layers: vec![PdfLayer {
                name: "Layer0".into(),
                operations: Vec::new(),
            }],
            xobjects: BTreeMap::new(),
        };
        self.pages.push(pdf_page);

        (self.pages.len() - 1, 0)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Registers one of the built-in fonts and returns its index, to be passed when writing text.
    /// Registering the same font twice returns the same index.
    pub fn add_font(&mut self, font: BuiltinFont) -> usize {
        if let Some(font_index) = self
            .fonts
            .iter()
            .position(|(_, registered_font)| *registered_font == font)
        {
            return font_index;
        }

        let font_object_id = self.inner_document.new_object_id();
        self.fonts.push((font_object_id, font));
        self.fonts.len() - 1
    }

    /// Builds the operations which write the text with the given font, size and color, with the
    /// baseline starting at the caret position. Nothing is added to the document, so that
    /// the caller can decide to discard them.
    pub fn text_operations(
        &self,
        font_index: usize,
        font_size: f32,
        color: [f32; 3],
        text: &str,
        caret_position: [f32; 2],
    ) -> Result<Vec<Operation>, ContextError> {
        if font_index >= self.fonts.len() {
            return Err(ContextError::with_context(format!(
                "Failed to find font {} into the fonts map",
                font_index
            )));
        }
        let encoded_text = encode_win_ansi(text)?;
        let [x, y] = caret_position;
        let [r, g, b] = color;

        Ok(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_resource_name(font_index).into_bytes()), font_size.into()],
            ),
            Operation::new(
                "Td",
                vec![millimeters_to_points(x).into(), millimeters_to_points(y).into()],
            ),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("Tj", vec![Object::String(encoded_text, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ])
    }

    /// Registers the image on the given page under the given reference, so that the `Do`
    /// operations built by `image_operations` can draw it.
    pub fn add_image_to_page(
        &mut self,
        page_index: usize,
        reference: XObjectReference,
        image: ImageXObject,
    ) -> Result<(), ContextError> {
        let pdf_page = self.get_mut_page(page_index)?;
        if pdf_page.xobjects.contains_key(&reference) {
            return Err(ContextError::with_context(format!(
                "The image {} is already present in the page {}",
                reference.name(),
                page_index
            )));
        }
        pdf_page.xobjects.insert(reference, image);

        Ok(())
    }

    /// Appends the operations to the specified layer of the specified page.
    pub fn add_operations_to_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        let pdf_layer_reference = self.get_mut_layer_in_page(layer_index, page_index)?;
        pdf_layer_reference.operations.extend(operations);

        Ok(())
    }

    /// Write the pages, fonts and document information to the underlying PDF document.
    pub fn write_all(
        &mut self,
        instance_id: String,
        creation_date: &OffsetDateTime,
    ) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        // The document information dictionary, dated with the start of the run
        let pdf_timestamp = to_pdf_timestamp_format(creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            ("CreationDate", String(pdf_timestamp.clone().into_bytes(), Literal)),
            ("ModDate", String(pdf_timestamp.into_bytes(), Literal)),
            ("Title", String(self.title.clone().into_bytes(), Literal)),
            (
                "Producer",
                String(
                    concat!("contact-sheet ", env!("CARGO_PKG_VERSION")).into(),
                    Literal,
                ),
            ),
            ("Identifier", String(self.identifier.clone().into_bytes(), Literal)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // The pages tree is referenced by the catalog before it is written, so its ID is reserved
        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        // The first half of the ID identifies the document, the second one this instance of it
        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document.trailer.set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        // All the pages share the same fonts dictionary
        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<Object>::new();
        for page in self.pages.iter() {
            // Media, trim and crop boxes all cover the whole page
            let page_box: Object = vec![
                Integer(0),
                Integer(0),
                Real(page.width),
                Real(page.height),
            ]
            .into();
            let mut page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Rotate", Integer(0)),
                ("MediaBox", page_box.clone()),
                ("TrimBox", page_box.clone()),
                ("CropBox", page_box),
                ("Parent", Reference(pages_id)),
            ]);

            // Every page only lists the images drawn on it
            let mut resource_dictionary =
                lopdf::Dictionary::from_iter(vec![("Font", Reference(fonts_dictionary_id))]);
            if !page.xobjects.is_empty() {
                let xobjects_dictionary: lopdf::Dictionary = page
                    .xobjects
                    .iter()
                    .map(|(reference, image)| {
                        let image_id = self.inner_document.add_object(image.to_stream());
                        (reference.name().to_string(), Reference(image_id))
                    })
                    .collect();
                resource_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }
            let resources_page_id = self
                .inner_document
                .add_object(Dictionary(resource_dictionary));
            page_dictionary.set("Resources", Reference(resources_page_id));

            // Merge the streams of the individual layers into the single content stream of the page
            let mut merged_layer_streams = Vec::<u8>::new();
            for layer in page.layers.iter() {
                merged_layer_streams.append(&mut layer.to_stream()?.content);
            }
            let page_content_id = self.inner_document.add_object(lopdf::Stream::new(
                lopdf::Dictionary::new(),
                merged_layer_streams,
            ));
            page_dictionary.set("Contents", Reference(page_content_id));

            let page_id = self.inner_document.add_object(page_dictionary);
            page_ids.push(Reference(page_id))
        }

        // Fill in the pages tree whose ID was reserved for the catalog
        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.pages.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Save the `PdfDocument` to the given path, returning the path itself.
    pub fn save_to_file(&mut self, pdf_path: &Path) -> Result<PathBuf, ContextError> {
        let pdf_document_bytes = self.save_to_bytes()?;
        std::fs::write(pdf_path, pdf_document_bytes).map_err(|error| {
            ContextError::with_error(format!("Failed to save the PDF file {:?}", pdf_path), &error)
        })?;

        Ok(pdf_path.to_path_buf())
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_index, (font_object_id, font)) in self.fonts.iter().enumerate() {
            let font_object = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(font.base_font_name().into())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]);
            self.inner_document
                .objects
                .insert(*font_object_id, Dictionary(font_object));
            font_dictionary.set(font_resource_name(font_index), Reference(*font_object_id));
        }
        font_dictionary
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))
    }

    // Retrieve the specified layer in the given page via the respective indices.
    fn get_mut_layer_in_page(
        &mut self,
        layer_index: usize,
        page_index: usize,
    ) -> Result<&mut PdfLayer, ContextError> {
        let pdf_page = self.get_mut_page(page_index)?;
        pdf_page
            .layers
            .get_mut(layer_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the layer with index {}",
                layer_index
            )))
    }
}

fn font_resource_name(font_index: usize) -> String {
    format!("F{font_index}")
}

/// Builds the operations which stroke a straight line between two points, with the given width.
pub fn line_operations(from: [f32; 2], to: [f32; 2], line_width: f32) -> Vec<Operation> {
    let [x1, y1] = from;
    let [x2, y2] = to;
    vec![
        Operation::new("w", vec![millimeters_to_points(line_width).into()]),
        Operation::new(
            "m",
            vec![millimeters_to_points(x1).into(), millimeters_to_points(y1).into()],
        ),
        Operation::new(
            "l",
            vec![millimeters_to_points(x2).into(), millimeters_to_points(y2).into()],
        ),
        Operation::new("S", vec![]),
    ]
}

/// Builds the operations which draw the referenced image scaled into the given box, whose
/// bottom-left corner is at `position`.
pub fn image_operations(
    reference: &XObjectReference,
    position: [f32; 2],
    size: [f32; 2],
) -> Vec<Operation> {
    let [x, y] = position;
    let [width, height] = size;
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                millimeters_to_points(width).into(),
                Object::Integer(0),
                Object::Integer(0),
                millimeters_to_points(height).into(),
                millimeters_to_points(x).into(),
                millimeters_to_points(y).into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(reference.name().as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// The color space a JPEG stream can be embedded with as it is. The decoder reports every JPEG as
/// RGB or greyscale once converted, so the components are counted in the frame header instead.
fn passthrough_color_space(image_format: ImageFormat, image_bytes: &[u8]) -> Option<&'static str> {
    if image_format != ImageFormat::Jpeg {
        return None;
    }
    match jpeg_component_count(image_bytes)? {
        3 => Some("DeviceRGB"),
        1 => Some("DeviceGray"),
        _ => None,
    }
}

/// Number of components declared by the frame header (`SOFn` segment) of a JPEG stream.
fn jpeg_component_count(jpeg_bytes: &[u8]) -> Option<u8> {
    if !jpeg_bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut offset = 2;
    while offset + 4 <= jpeg_bytes.len() {
        if jpeg_bytes[offset] != 0xFF {
            return None;
        }
        let marker = jpeg_bytes[offset + 1];
        // Fill bytes may precede any marker
        if marker == 0xFF {
            offset += 1;
            continue;
        }
        // DHT, JPG and DAC share the range of the frame markers
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            return jpeg_bytes.get(offset + 9).copied();
        }
        let segment_length =
            u16::from_be_bytes([jpeg_bytes[offset + 2], jpeg_bytes[offset + 3]]) as usize;
        offset += 2 + segment_length;
    }

    None
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
