pub mod summary;

pub use summary::{ summarize_csv, CsvError };

/// A file part read from the multipart body.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Csv,
    Other,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into().to_lowercase(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> FileKind {
        classify(&self.content_type, &self.file_name)
    }
}

/// Images are recognised by MIME type only; CSV by MIME type or a `.csv` suffix (case-sensitive).
pub fn classify(content_type: &str, file_name: &str) -> FileKind {
    let content_type = content_type.trim().to_lowercase();
    if content_type.starts_with("image/") {
        FileKind::Image
    } else if content_type == "text/csv" || file_name.ends_with(".csv") {
        FileKind::Csv
    } else {
        FileKind::Other
    }
}
