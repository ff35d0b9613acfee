//! PDF assembly: merging a document's page images into one PDF
//!
//! Page files are named `<page>.jpg`, so ordering normally sorts by the
//! number in the filename. If any filename does not parse as a number the
//! whole list falls back to a lexicographic sort, which places `10.jpg`
//! before `2.jpg`; this matches the long-standing behavior and is kept as-is.
//!
//! Every page is decoded, converted to RGB, re-encoded as JPEG, and embedded
//! as a DCTDecode image XObject on its own PDF page sized to the image.

mod cleanup;

pub use cleanup::cleanup_images;

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::path::Path;
use tracing::{info, warn};

use crate::error::AssemblyError;
use crate::types::AssembledDocument;

/// JPEG quality used when re-encoding pages for embedding
const JPEG_QUALITY: u8 = 90;

/// Merge a document's page images into `<doc_name>.pdf` in `output_dir`.
///
/// Returns `Ok(None)` when the image directory holds no page images (a
/// warning is logged, nothing is written). Blocking: run under
/// `tokio::task::spawn_blocking` from async contexts.
pub fn merge_images_to_pdf(
    doc_name: &str,
    image_dir: &Path,
    output_dir: &Path,
) -> Result<Option<AssembledDocument>, AssemblyError> {
    let mut images = Vec::new();
    if image_dir.exists() {
        for entry in std::fs::read_dir(image_dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(".jpg") {
                images.push(name);
            }
        }
    }

    sort_page_files(&mut images);

    if images.is_empty() {
        warn!(doc = doc_name, "no page images found, skipping PDF creation");
        return Ok(None);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for name in &images {
        let page_id = append_image_page(&mut doc, pages_id, &image_dir.join(name))?;
        kids.push(page_id.into());
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let pdf_path = output_dir.join(format!("{doc_name}.pdf"));
    doc.save(&pdf_path)?;

    info!(
        doc = doc_name,
        path = %pdf_path.display(),
        pages = page_count,
        "created PDF"
    );

    Ok(Some(AssembledDocument {
        document: doc_name.to_string(),
        pdf_path,
        page_count,
    }))
}

/// Sort page filenames by the page number in the stem, falling back to a
/// lexicographic sort of the whole list when any stem is not numeric.
fn sort_page_files(images: &mut [String]) {
    if images.iter().all(|name| page_number(name).is_some()) {
        images.sort_by_key(|name| page_number(name).unwrap_or(0));
    } else {
        images.sort();
    }
}

/// Parse the page number from a filename like `12.jpg`
fn page_number(name: &str) -> Option<u64> {
    name.split('.').next()?.parse().ok()
}

/// Decode one page image, re-encode it as RGB JPEG, and append it to the
/// document as a full-page image XObject. Returns the new page's object id.
fn append_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    path: &Path,
) -> Result<ObjectId, AssemblyError> {
    let decoded = image::open(path).map_err(|e| AssemblyError::ImageDecode {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
        .map_err(|e| AssemblyError::ImageEncode {
            path: path.to_path_buf(),
            source: e,
        })?;

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    // One page per image, MediaBox sized to the pixel dimensions (72 dpi),
    // image drawn to fill the page.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (width as i64).into(),
                    0.into(),
                    0.into(),
                    (height as i64).into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            (width as i64).into(),
            (height as i64).into(),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    Ok(page_id)
}
