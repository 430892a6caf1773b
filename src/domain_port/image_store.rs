/// An image received in a multipart request, already checked against the
/// upload policy.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the image and return the public path it is served under.
    async fn save(&self, image: &ImageUpload) -> Result<String, ImageStoreError>;

    /// Delete a previously saved image by public path. Missing files are not
    /// an error.
    async fn remove(&self, public_path: &str) -> Result<(), ImageStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("invalid image path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
