// src/common/media.rs

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use crate::common::error::AppError;

// Limite de tamanho de uma foto depois de decodificada (5 MB)
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Limite do corpo das requisições: a foto em base64 mais 1 MB para o resto do JSON.
pub const MAX_REQUEST_BYTES: usize = MAX_PHOTO_BYTES.div_ceil(3) * 4 + 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredPhoto {
    /// Caminho relativo ao MEDIA_ROOT (ex: "visits/<uuid>.jpg")
    pub path: String,
    /// MD5 em hexadecimal, usado para detectar fotos repetidas
    pub hash: String,
}

/// Decodifica uma foto em base64 (aceita o prefixo "data:image/...;base64,").
pub fn decode_photo(encoded: &str) -> Result<(Vec<u8>, &'static str), AppError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::field("photo", "photo_invalid"))?;

    if bytes.is_empty() || bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::field("photo", "photo_size"));
    }

    let ext = image_extension(&bytes).ok_or_else(|| AppError::field("photo", "photo_invalid"))?;
    Ok((bytes, ext))
}

fn image_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Armazena arquivos enviados (fotos de visitas e de clientes) sob o MEDIA_ROOT.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn save_photo(&self, folder: &str, encoded: &str) -> Result<StoredPhoto, AppError> {
        let (bytes, ext) = decode_photo(encoded)?;
        let hash = md5_hex(&bytes);

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        tracing::debug!("Foto salva em {}/{} ({} bytes)", folder, file_name, bytes.len());
        Ok(StoredPhoto { path: format!("{}/{}", folder, file_name), hash })
    }

    /// Apaga um arquivo salvo cuja operação não chegou ao commit. Falhas só vão para o log.
    pub async fn discard(&self, path: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(path)).await {
            tracing::warn!("Não foi possível apagar {}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn decodes_data_url_and_detects_png() {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let (bytes, ext) = decode_photo(&encoded).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(bytes, PNG_HEADER);
    }

    #[test]
    fn rejects_non_images_and_garbage() {
        let text = STANDARD.encode(b"isto nao e uma imagem");
        assert!(matches!(decode_photo(&text), Err(AppError::FieldErrors(_))));
        assert!(matches!(decode_photo("%%%"), Err(AppError::FieldErrors(_))));
        assert!(matches!(decode_photo(""), Err(AppError::FieldErrors(_))));
    }

    #[test]
    fn identical_photos_share_the_hash() {
        let a = md5_hex(PNG_HEADER);
        let b = md5_hex(PNG_HEADER);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, md5_hex(&[0xFF, 0xD8, 0xFF, 0xE0]));
    }

    #[tokio::test]
    async fn saves_photo_under_folder() {
        let root = std::env::temp_dir().join(format!("rutas-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&root);
        let encoded = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);

        let stored = store.save_photo("visits", &encoded).await.unwrap();
        assert!(stored.path.starts_with("visits/"));
        assert!(stored.path.ends_with(".jpg"));
        assert!(root.join(&stored.path).exists());

        store.discard(&stored.path).await;
        assert!(!root.join(&stored.path).exists());
        // Segunda vez: arquivo já não existe, só registra no log
        store.discard(&stored.path).await;

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
