use crate::common::*;

/// The undecoded image file with its source path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub path: String,
    pub content: Vec<u8>,
}

/// The normalized image and its class label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabeledRecord {
    pub label: i32,
    /// Raw RGB bytes of the normalized square image.
    pub image: Vec<u8>,
}

impl RawRecord {
    /// Load a record from an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| format_err!("non-UTF-8 path '{}'", path.display()))?;
        let content = fs::read(path)
            .with_context(|| format!("failed to read image file '{}'", path.display()))?;

        Ok(Self {
            path: path_str.to_owned(),
            content,
        })
    }

    /// Apply the label and image transforms.
    pub fn to_labeled(&self, image_size: u32) -> Result<LabeledRecord> {
        let label = crate::transform::file_to_label(&self.path)?;
        let image = crate::transform::normalize_image(&self.content, image_size)
            .with_context(|| format!("failed to normalize image '{}'", self.path))?;
        Ok(LabeledRecord { label, image })
    }
}
