//! Summary export to PDF via pdfium.
//!
//! pdfium renders and authors documents alike; the page layout comes from
//! [`crate::export::layout`], this module only draws it. pdfium calls are
//! blocking and use thread-local state, so drawing runs in `spawn_blocking`.
//!
//! The pdfium shared library is looked up in this order:
//! 1. `PDFIUM_LIB_PATH`
//! 2. the current directory
//! 3. the system library path

use crate::content::SummaryData;
use crate::error::StudyError;
use crate::export::layout::{layout_summary, Element, FontStyle, Page, PAGE_HEIGHT_MM};
use crate::generate::write_atomic;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name the summary is saved under when no path is given.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "Lernzusammenfassung.pdf";

const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Today's date the way the export header shows it, e.g. `19.10.2026`.
pub fn export_date() -> String {
    chrono::Local::now().format("%-d.%-m.%Y").to_string()
}

/// Render the summary into PDF bytes.
pub async fn render_pdf(summary: &SummaryData) -> Result<Vec<u8>, StudyError> {
    let pages = layout_summary(summary, &export_date());
    debug!("Laid out summary on {} pages", pages.len());

    tokio::task::spawn_blocking(move || draw_pages(&pages))
        .await
        .map_err(|e| StudyError::Internal(format!("Export task panicked: {}", e)))?
}

/// Export the summary to `path`, or to [`DEFAULT_EXPORT_FILE_NAME`] in the
/// current directory. Returns the written path.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn export_pdf(
    summary: &SummaryData,
    path: Option<&Path>,
) -> Result<PathBuf, StudyError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE_NAME));

    let bytes = render_pdf(summary).await?;
    write_atomic(&path, &bytes).await?;

    info!("Exported summary to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

fn bind_pdfium() -> Result<Pdfium, StudyError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| StudyError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn points(mm: f32) -> PdfPoints {
    PdfPoints::new(mm * POINTS_PER_MM)
}

/// Layout y runs top-down, PDF y bottom-up.
fn flip_y(mm: f32) -> PdfPoints {
    points(PAGE_HEIGHT_MM - mm)
}

fn draw_pages(pages: &[Page]) -> Result<Vec<u8>, StudyError> {
    let pdfium = bind_pdfium()?;
    let export_err = |e: PdfiumError| StudyError::ExportFailed(format!("{:?}", e));

    let mut document = pdfium.create_new_pdf().map_err(export_err)?;

    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();
    let italic = document.fonts_mut().helvetica_oblique();

    for layout_page in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(export_err)?;

        for element in &layout_page.elements {
            match element {
                Element::Text {
                    text,
                    x,
                    y,
                    size,
                    style,
                } => {
                    let font = match style {
                        FontStyle::Regular => regular,
                        FontStyle::Bold => bold,
                        FontStyle::Italic => italic,
                    };
                    page.objects_mut()
                        .create_text_object(
                            points(*x),
                            flip_y(*y),
                            text.as_str(),
                            font,
                            PdfPoints::new(*size),
                        )
                        .map_err(export_err)?;
                }
                Element::Rule { x1, x2, y } => {
                    page.objects_mut()
                        .create_path_object_line(
                            points(*x1),
                            flip_y(*y),
                            points(*x2),
                            flip_y(*y),
                            PdfColor::new(200, 200, 200, 255),
                            PdfPoints::new(0.5),
                        )
                        .map_err(export_err)?;
                }
            }
        }
    }

    document.save_to_bytes().map_err(export_err)
}
