use crate::types::*;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub struct CompressionSettings {
    pub quality: u8, // 1-100 for JPEG
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Image decoding and image-to-PDF assembly.
#[derive(Debug, Clone, Default)]
pub struct ImageProcessor {
    compression_settings: CompressionSettings,
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: CompressionSettings) -> Self {
        Self {
            compression_settings: settings,
        }
    }

    /// Build a PDF with one page per image, in the order given. Each page is
    /// the size of its image at 72 DPI.
    pub fn images_to_pdf(&self, images: &[Vec<u8>]) -> Result<Vec<u8>, ConversionError> {
        if images.is_empty() {
            return Err(ConversionError::MissingField {
                field: "files".to_string(),
            });
        }

        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            let id = Ref::new(next_id);
            next_id += 1;
            id
        };

        let catalog_id = alloc();
        let page_tree_id = alloc();
        let mut page_ids = Vec::with_capacity(images.len());

        for (index, content) in images.iter().enumerate() {
            let img = image::load_from_memory(content)?;
            let (width, height) = img.dimensions();
            let jpeg = self.encode_jpeg(&img)?;

            let page_id = alloc();
            let image_id = alloc();
            let content_id = alloc();
            let image_name = Name(b"Im1");

            let mut image_obj = pdf.image_xobject(image_id, &jpeg);
            image_obj.filter(Filter::DctDecode);
            image_obj.width(width as i32);
            image_obj.height(height as i32);
            image_obj.color_space().device_rgb();
            image_obj.bits_per_component(8);
            image_obj.finish();

            let (page_width, page_height) = (width as f32, height as f32);
            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, page_width, page_height));
            page.parent(page_tree_id);
            page.contents(content_id);
            page.resources().x_objects().pair(image_name, image_id);
            page.finish();

            let mut drawing = Content::new();
            drawing.save_state();
            drawing.transform([page_width, 0.0, 0.0, page_height, 0.0, 0.0]);
            drawing.x_object(image_name);
            drawing.restore_state();
            pdf.stream(content_id, &drawing.finish());

            log::debug!("Placed image {} ({}x{}, {} bytes as JPEG)", index + 1, width, height, jpeg.len());
            page_ids.push(page_id);
        }

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        let pdf_bytes = pdf.finish();
        log::info!("Created PDF from {} images: {} bytes", images.len(), pdf_bytes.len());
        Ok(pdf_bytes)
    }

    /// Encode image as baseline RGB JPEG with the configured quality.
    fn encode_jpeg(&self, img: &DynamicImage) -> Result<Vec<u8>, ConversionError> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut output = Vec::new();
        let mut cursor = Cursor::new(&mut output);

        rgb.write_to(&mut cursor, ImageOutputFormat::Jpeg(self.compression_settings.quality))?;
        Ok(output)
    }
}
