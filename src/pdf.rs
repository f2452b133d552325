//! # Page Sources
//!
//! Decodes input documents into RGB page images for the raster pipeline.
//!
//! ## PDF Rendering
//!
//! PDFs are rasterized by Poppler's `pdftoppm` into a temporary directory:
//!
//! ```text
//! pdftoppm -png -r <dpi> input.pdf <tmp>/page
//!   → page-1.png, page-2.png, ... page-10.png   (or page-01.png ...)
//! ```
//!
//! Output files are sorted by their page number, not by name, so `page-10`
//! follows `page-9`. A single-page run that produced `page.png` is accepted
//! too.
//!
//! ## Image Files
//!
//! [`ImageFile`] treats a PNG/JPEG as a one-page document, so the pipeline
//! works without Poppler installed.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbImage;
use tracing::{debug, info};

use crate::error::{LabelprintError, Result};

/// Magic bytes at the start of every PDF file
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Output prefix passed to `pdftoppm`
const PAGE_PREFIX: &str = "page";

/// Something that turns a document on disk into page images.
pub trait PageSource: Send + Sync {
    /// Render every page of the document at `path`, in page order.
    fn render_pages(&self, path: &Path) -> Result<Vec<RgbImage>>;

    /// Render an in-memory document by spilling it to a temporary file.
    fn render_bytes(&self, data: &[u8]) -> Result<Vec<RgbImage>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(data)?;
        file.flush()?;
        self.render_pages(file.path())
    }
}

// ============================================================================
// PDF VALIDATION
// ============================================================================

/// Whether `data` starts with the `%PDF` magic.
pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

/// Fail with `InvalidInput` unless `path` exists and starts with `%PDF`.
pub fn check_pdf(path: &Path) -> Result<()> {
    let mut file = fs::File::open(path).map_err(|e| {
        LabelprintError::InvalidInput(format!("cannot open {}: {}", path.display(), e))
    })?;
    let mut magic = [0u8; 4];
    let n = file.read(&mut magic)?;
    if !is_pdf(&magic[..n]) {
        return Err(LabelprintError::InvalidInput(format!(
            "{} is not a PDF file",
            path.display()
        )));
    }
    Ok(())
}

/// Whether the file at `path` looks like a PDF. Unreadable files are not.
pub fn path_is_pdf(path: &Path) -> bool {
    check_pdf(path).is_ok()
}

// ============================================================================
// PDFTOPPM
// ============================================================================

/// # Poppler Renderer
///
/// Rasterizes PDFs by running `pdftoppm`.
///
/// ```no_run
/// use std::path::Path;
/// use labelprint::pdf::{PageSource, Pdftoppm};
///
/// let pages = Pdftoppm::new(203).render_pages(Path::new("label.pdf"))?;
/// println!("{} pages", pages.len());
/// # Ok::<(), labelprint::error::LabelprintError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    /// Rendering resolution passed as `-r`
    pub dpi: u32,
    /// Renderer executable, `pdftoppm` on `PATH` by default
    pub program: PathBuf,
}

impl Pdftoppm {
    pub fn new(dpi: u32) -> Self {
        Self {
            dpi,
            program: PathBuf::from("pdftoppm"),
        }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new(203)
    }
}

impl PageSource for Pdftoppm {
    fn render_pages(&self, path: &Path) -> Result<Vec<RgbImage>> {
        check_pdf(path)?;
        if self.dpi == 0 {
            return Err(LabelprintError::InvalidInput(
                "render DPI must be non-zero".into(),
            ));
        }

        let dir = tempfile::Builder::new().prefix("labelprint").tempdir()?;
        let prefix = dir.path().join(PAGE_PREFIX);

        info!("Rendering {} at {} DPI", path.display(), self.dpi);
        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(path)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                LabelprintError::Render(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(LabelprintError::Render(format!(
                "{} failed ({}): {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let files = collect_pages(dir.path())?;
        if files.is_empty() {
            return Err(LabelprintError::Render(format!(
                "{} produced no pages",
                self.program.display()
            )));
        }

        files.iter().map(|f| load_image(f)).collect()
    }
}

/// Rendered page files in `dir`, ordered by page number.
pub fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut numbered = Vec::new();
    let mut single = None;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem == PAGE_PREFIX {
            single = Some(path);
        } else if let Some(number) = page_number(stem) {
            numbered.push((number, path));
        }
    }

    numbered.sort_by_key(|(number, _)| *number);
    let mut pages: Vec<PathBuf> = numbered.into_iter().map(|(_, path)| path).collect();
    if pages.is_empty() {
        pages.extend(single);
    }
    Ok(pages)
}

/// Page number from a `page-N` file stem.
fn page_number(stem: &str) -> Option<u32> {
    stem.strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

// ============================================================================
// IMAGE FILES
// ============================================================================

/// Decode an image file into RGB.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| {
        LabelprintError::Image(format!("failed to decode {}: {}", path.display(), e))
    })?;
    let rgb = img.to_rgb8();
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        rgb.width(),
        rgb.height()
    );
    Ok(rgb)
}

/// A raster image file used as a single page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFile;

impl PageSource for ImageFile {
    fn render_pages(&self, path: &Path) -> Result<Vec<RgbImage>> {
        Ok(vec![load_image(path)?])
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(b"%PDF-1.7\n"));
        assert!(!is_pdf(b"\x89PNG"));
        assert!(!is_pdf(b"%PD"));
    }

    #[test]
    fn test_check_pdf_missing_file() {
        let err = check_pdf(Path::new("/nonexistent/label.pdf")).unwrap_err();
        assert!(matches!(err, LabelprintError::InvalidInput(_)));
    }

    #[test]
    fn test_check_pdf_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            check_pdf(&path),
            Err(LabelprintError::InvalidInput(_))
        ));

        fs::write(&path, b"%PDF-1.4").unwrap();
        assert!(check_pdf(&path).is_ok());
        assert!(path_is_pdf(&path));
    }

    #[test]
    fn test_collect_pages_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "page-9.png", "other.png"] {
            touch(dir.path(), name);
        }
        let pages = collect_pages(dir.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["page-1.png", "page-2.png", "page-9.png", "page-10.png"]);
    }

    #[test]
    fn test_collect_pages_zero_padded() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "page-02.png");
        touch(dir.path(), "page-01.png");
        let pages = collect_pages(dir.path()).unwrap();
        assert!(pages[0].ends_with("page-01.png"));
        assert!(pages[1].ends_with("page-02.png"));
    }

    #[test]
    fn test_collect_pages_single_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "page.png");
        assert_eq!(collect_pages(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_renderer_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        fs::write(&path, b"%PDF-1.4\n").unwrap();

        let source = Pdftoppm {
            dpi: 203,
            program: PathBuf::from("labelprint-no-such-renderer"),
        };
        assert!(matches!(
            source.render_pages(&path),
            Err(LabelprintError::Render(_))
        ));
    }

    #[test]
    fn test_non_pdf_bytes_rejected_before_rendering() {
        let err = Pdftoppm::default().render_bytes(b"GIF89a").unwrap_err();
        assert!(matches!(err, LabelprintError::InvalidInput(_)));
    }

    #[test]
    fn test_image_file_is_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        RgbImage::from_pixel(12, 5, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let pages = ImageFile.render_pages(&path).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), (12, 5));
        assert_eq!(pages[0].get_pixel(0, 0).0, [10, 20, 30]);
    }
}
