//! Document operations exposed by the remote service
//!
//! Each operation is a single multipart POST to its own endpoint. The shape of
//! the request (file parts, text fields) is the only thing that differs
//! between them, so one [`Operation`] value describes any of them.

use bon::Builder;
use mime::Mime;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A file uploaded as one multipart part
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub path: PathBuf,
    pub mime: Mime,
}

impl FilePart {
    pub fn new(field: impl Into<String>, path: impl Into<PathBuf>, mime: Mime) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
            mime,
        }
    }

    /// Name sent in the part's `filename`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.field.clone())
    }
}

/// One submission: endpoint plus the multipart payload
#[derive(Debug, Clone)]
pub struct Operation {
    name: &'static str,
    endpoint: String,
    files: Vec<FilePart>,
    fields: BTreeMap<String, String>,
}

impl Operation {
    pub fn new(name: &'static str, endpoint: impl Into<String>) -> Self {
        Self {
            name,
            endpoint: endpoint.into(),
            files: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Parameters covered by the submission signature: `clientId` plus every
    /// text field of the form. File parts are not signed.
    pub fn signing_params(&self, client_id: &str) -> BTreeMap<String, String> {
        let mut params = self.fields.clone();
        params.insert("clientId".to_string(), client_id.to_string());
        params
    }

    /// Merge several PDFs packed in one zip archive
    pub fn combine(zip: impl AsRef<Path>, config: &CombineConfig) -> Self {
        Self::new("combine", "document/combine")
            .with_file(FilePart::new(
                "inputZipDocument",
                zip.as_ref(),
                mime::APPLICATION_OCTET_STREAM,
            ))
            .with_field("config", config.to_json())
    }

    /// Diff two PDFs
    pub fn compare(
        base: impl AsRef<Path>,
        compared: impl AsRef<Path>,
        options: &CompareOptions,
    ) -> Self {
        Self::new("compare", "document/compare")
            .with_file(FilePart::new(
                "inputBaseDocument",
                base.as_ref(),
                mime::APPLICATION_PDF,
            ))
            .with_file(FilePart::new(
                "inputCompareDocument",
                compared.as_ref(),
                mime::APPLICATION_PDF,
            ))
            .with_field("resultType", options.result_type.clone())
            .with_field("compareType", options.compare_type.clone())
    }

    /// Render a web page or an uploaded HTML document to PDF
    pub fn create_from_html(source: &HtmlSource, config: &HtmlPageConfig) -> Self {
        let op = Self::new("create-from-html", "document/createFromHtml")
            .with_field("config", config.to_json());

        match source {
            HtmlSource::Url(url) => op.with_field("url", url.clone()).with_field("format", "url"),
            HtmlSource::File(path) => op
                .with_file(FilePart::new("inputDocument", path, mime::TEXT_HTML))
                .with_field("format", "html"),
        }
    }

    /// Strip the open password from a protected PDF
    pub fn remove_password(pdf: impl AsRef<Path>, password: impl Into<String>) -> Self {
        Self::new("remove-password", "document/removePassword")
            .with_file(FilePart::new(
                "inputDocument",
                pdf.as_ref(),
                mime::APPLICATION_PDF,
            ))
            .with_field("password", password)
    }

    /// Convert a PDF to another format (`image`, `word`, `excel`, ...)
    pub fn convert(pdf: impl AsRef<Path>, format: impl Into<String>, config: &ConvertConfig) -> Self {
        Self::new("convert", "document/convert")
            .with_file(FilePart::new(
                "inputDocument",
                pdf.as_ref(),
                mime::APPLICATION_PDF,
            ))
            .with_field("format", format)
            .with_field("config", config.to_json())
    }

    /// Flatten annotations and form fields into page content
    pub fn flatten(pdf: impl AsRef<Path>, page_range: impl Into<String>) -> Self {
        Self::new("flatten", "document/flatten")
            .with_file(FilePart::new(
                "inputDocument",
                pdf.as_ref(),
                mime::APPLICATION_PDF,
            ))
            .with_field("pageRange", page_range)
    }

    /// Extract text or images; `page_range` is omitted when `None`
    pub fn extract(pdf: impl AsRef<Path>, mode: impl Into<String>, page_range: Option<&str>) -> Self {
        let op = Self::new("extract", "document/extract")
            .with_file(FilePart::new(
                "inputDocument",
                pdf.as_ref(),
                mime::APPLICATION_PDF,
            ))
            .with_field("mode", mode);

        match page_range {
            Some(range) if !range.is_empty() => op.with_field("pageRange", range),
            _ => op,
        }
    }
}

/// Page-merge options for [`Operation::combine`]
#[derive(Debug, Clone, Builder)]
pub struct CombineConfig {
    #[builder(default = true)]
    pub add_bookmark: bool,
    #[builder(default = false)]
    pub add_toc: bool,
    #[builder(default = true)]
    pub continue_merge: bool,
    #[builder(default = false)]
    pub retain_page_num: bool,
    #[builder(default = "1-4".to_string(), into)]
    pub bookmark_levels: String,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CombineConfig {
    pub fn to_json(&self) -> String {
        json!({
            "isAddBookmark": self.add_bookmark,
            "isAddTOC": self.add_toc,
            "isContinueMerge": self.continue_merge,
            "isRetainPageNum": self.retain_page_num,
            "bookmarkLevels": self.bookmark_levels,
        })
        .to_string()
    }
}

#[derive(Debug, Clone, Builder)]
pub struct CompareOptions {
    #[builder(default = "json".to_string(), into)]
    pub result_type: String,
    #[builder(default = "all".to_string(), into)]
    pub compare_type: String,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlSource {
    Url(String),
    File(PathBuf),
}

/// Page geometry for [`Operation::create_from_html`]
#[derive(Debug, Clone, Builder)]
pub struct HtmlPageConfig {
    #[builder(default = 640)]
    pub width: u32,
    #[builder(default = 900)]
    pub height: u32,
    #[builder(default = 0)]
    pub rotate: u32,
    #[builder(default = 1)]
    pub page_mode: u32,
    #[builder(default = 1)]
    pub page_scaling: u32,
}

impl Default for HtmlPageConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HtmlPageConfig {
    pub fn to_json(&self) -> String {
        json!({
            "width": self.width,
            "height": self.height,
            "rotate": self.rotate,
            "pageMode": self.page_mode,
            "pageScaling": self.page_scaling,
        })
        .to_string()
    }
}

#[derive(Debug, Clone, Builder)]
pub struct ConvertConfig {
    #[builder(default = 96)]
    pub dpi: u32,
    #[builder(default = "all".to_string(), into)]
    pub page_range: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConvertConfig {
    pub fn to_json(&self) -> String {
        json!({
            "dpi": self.dpi,
            "pageRange": self.page_range,
        })
        .to_string()
    }
}
