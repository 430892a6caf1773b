use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use nanoid::nanoid;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Public URL prefix under which stored images are served.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Stores images as flat files in one directory.
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsImageStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `user-<millis>-<random><ext>`, keeping the client's extension if it
    /// looks sane.
    fn file_name(image: &ImageUpload) -> String {
        let alphabet: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
        let ext = image
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        format!(
            "user-{}-{}{}",
            Utc::now().timestamp_millis(),
            nanoid!(9, &alphabet),
            ext
        )
    }

    /// Map a public path back to a file in `dir`, refusing anything that is
    /// not a plain file name.
    fn resolve(&self, public_path: &str) -> Result<PathBuf, ImageStoreError> {
        let name = public_path
            .strip_prefix(UPLOADS_PREFIX)
            .ok_or_else(|| ImageStoreError::InvalidPath(public_path.to_string()))?;
        let is_plain = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !is_plain {
            return Err(ImageStoreError::InvalidPath(public_path.to_string()));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait::async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, image: &ImageUpload) -> Result<String, ImageStoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = Self::file_name(image);
        tokio::fs::write(self.dir.join(&name), &image.data).await?;
        debug!(file = %name, bytes = image.data.len(), "image stored");
        Ok(format!("{UPLOADS_PREFIX}{name}"))
    }

    async fn remove(&self, public_path: &str) -> Result<(), ImageStoreError> {
        let path = self.resolve(public_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FsImageStore {
        FsImageStore::new(std::env::temp_dir().join(format!("inkwell-fs-{}", uuid::Uuid::new_v4())))
    }

    fn png() -> ImageUpload {
        ImageUpload {
            file_name: Some("Holiday.PNG".to_string()),
            content_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn save_then_remove() {
        let store = store();
        let public = store.save(&png()).await.unwrap();

        assert!(public.starts_with("/uploads/user-"));
        assert!(public.ends_with(".png"));
        let on_disk = store.resolve(&public).unwrap();
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), png().data);

        store.remove(&public).await.unwrap();
        assert!(!on_disk.exists());
        // second removal is a no-op
        store.remove(&public).await.unwrap();
    }

    #[tokio::test]
    async fn refuses_paths_outside_the_directory() {
        let store = store();
        for bad in ["/uploads/../secret", "/etc/passwd", "/uploads/", "/uploads/a/b.png"] {
            assert!(matches!(
                store.remove(bad).await,
                Err(ImageStoreError::InvalidPath(_))
            ));
        }
    }

    #[test]
    fn drops_odd_extensions() {
        let mut image = png();
        image.file_name = Some("x.p/ng".to_string());
        assert!(!FsImageStore::file_name(&image).contains('/'));
        image.file_name = None;
        let name = FsImageStore::file_name(&image);
        assert!(name.starts_with("user-") && !name.contains('.'));
    }
}
