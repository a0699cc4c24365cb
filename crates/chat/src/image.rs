use std::path::{Path, PathBuf};

use base64::Engine;
use snafu::{OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ImageError {
    #[snafu(display("{path:?} is not a supported image file"))]
    UnsupportedImage { stage: &'static str, path: PathBuf },
    #[snafu(display("failed to read image file {path:?}"))]
    ReadImage {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ImageResult<T> = Result<T, ImageError>;

/// MIME type for an image path, judged by extension.
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}

pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{payload}")
}

/// Reads an image file into a `data:` URI suitable for a message attachment.
pub async fn read_image_data_uri(path: &Path) -> ImageResult<String> {
    let mime_type = image_mime_type(path).context(UnsupportedImageSnafu {
        stage: "image-detect-mime",
        path: path.to_path_buf(),
    })?;

    let bytes = tokio::fs::read(path).await.context(ReadImageSnafu {
        stage: "image-read-file",
        path: path.to_path_buf(),
    })?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), mime_type, "read image attachment");
    Ok(encode_data_uri(mime_type, &bytes))
}
