//! Clasificación de contenedores a partir de los bytes iniciales del archivo.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

const MAGIC_LEN: usize = 64;
const XML_PROBE_LEN: usize = 8192;

/// Tipos de contenedor que el motor sabe distinguir.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpeg,
    Png,
    Gif,
    Pdf,
    Rtf,
    Docx,
    Xlsx,
    Pptx,
    Doc,
    Xls,
    Ppt,
    Word2003Xml,
    Other,
}

/// Determina el tipo de archivo combinando bytes mágicos y extensión.
///
/// La firma binaria manda; la extensión solo desempata contenedores
/// ambiguos (ZIP con extensión heredada, XML de Word 2003).
pub fn classify(path: &Path) -> FileType {
    let head = read_head(path, MAGIC_LEN);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return FileType::Jpeg;
    }
    if head.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return FileType::Png;
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return FileType::Gif;
    }
    if head.starts_with(b"%PDF-") {
        return FileType::Pdf;
    }
    if head.starts_with(b"{\\rtf") {
        return FileType::Rtf;
    }

    // OOXML guardado con extensiones heredadas de Office.
    if head.starts_with(b"PK")
        && matches!(extension.as_str(), "doc" | "xls" | "ppt")
        && let Some(ooxml) = probe_ooxml_zip(path)
    {
        return ooxml;
    }

    match extension.as_str() {
        "doc" => {
            if looks_like_word2003xml(&head, path) {
                return FileType::Word2003Xml;
            }
            return FileType::Doc;
        }
        "xls" => return FileType::Xls,
        "ppt" => return FileType::Ppt,
        "docx" => return FileType::Docx,
        "xlsx" => return FileType::Xlsx,
        "pptx" => return FileType::Pptx,
        _ => {}
    }

    if looks_like_word2003xml(&head, path) {
        return FileType::Word2003Xml;
    }

    FileType::Other
}

fn read_head(path: &Path, limit: usize) -> Vec<u8> {
    let mut buffer = vec![0_u8; limit];
    let Ok(mut file) = File::open(path) else {
        return Vec::new();
    };
    let mut filled = 0;
    while filled < limit {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(bytes_read) => filled += bytes_read,
            Err(_) => return Vec::new(),
        }
    }
    buffer.truncate(filled);
    buffer
}

/// Busca las partes características de cada variante OOXML dentro del ZIP.
fn probe_ooxml_zip(path: &Path) -> Option<FileType> {
    let file = File::open(path).ok()?;
    let archive = ZipArchive::new(file).ok()?;
    let names: Vec<&str> = archive.file_names().collect();
    if names.contains(&"word/document.xml") {
        return Some(FileType::Docx);
    }
    if names.contains(&"xl/workbook.xml") {
        return Some(FileType::Xlsx);
    }
    if names.contains(&"ppt/presentation.xml") {
        return Some(FileType::Pptx);
    }
    None
}

/// Reconoce documentos WordprocessingML 2003 por sus marcadores de namespace.
fn looks_like_word2003xml(head: &[u8], path: &Path) -> bool {
    let trimmed: Vec<u8> = head
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .collect();
    if !(trimmed.starts_with(b"<?xml") || trimmed.starts_with(b"<")) {
        return false;
    }

    let probe = read_head(path, XML_PROBE_LEN);
    let text = String::from_utf8_lossy(&probe);
    text.contains("w:wordDocument")
        || (text.contains("wordml") && text.contains("http://schemas.microsoft.com/office/word"))
}
