//! Manejadores por formato y despacho de detección y limpieza.

pub(crate) mod gif;
pub(crate) mod jpeg;
pub(crate) mod office;
pub(crate) mod ole;
pub(crate) mod pdf;
pub(crate) mod png;
pub(crate) mod rtf;
pub(crate) mod word2003;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use crate::exiftool::ExifTool;
use crate::filetype::{self, FileType};
use crate::replace;
use crate::report::{CleanResult, DetectionReport};

/// Búsqueda de una subsecuencia dentro de un slice de bytes.
pub(crate) fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

/// Lee hasta llenar el buffer y devuelve cuántos bytes se obtuvieron.
///
/// A diferencia de `read_exact`, un final de archivo limpio no es error:
/// cada manejador decide si el conteo corto es aceptable.
pub(crate) fn read_full<R: std::io::Read>(
    reader: &mut R,
    buffer: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let bytes_read = reader.read(&mut buffer[filled..])?;
        if bytes_read == 0 {
            break;
        }
        filled += bytes_read;
    }
    Ok(filled)
}

pub(crate) fn read_error(error: std::io::Error) -> String {
    format!("No se pudo leer el archivo: {}", error)
}

/// Despacha la detección al manejador nativo del tipo clasificado.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let file_type = filetype::classify(path);
    match file_type {
        FileType::Word2003Xml => word2003::detect(path),
        FileType::Rtf => rtf::detect(path),
        FileType::Doc | FileType::Xls | FileType::Ppt => {
            let mut report = ole::detect(path, file_type);
            // ExifTool puede nombrar campos que la sonda nativa no desglosa.
            if let Some(tool) = ExifTool::probe() {
                for label in tool.sensitive_labels(path) {
                    report.push_label(label);
                }
            }
            report
        }
        FileType::Docx | FileType::Xlsx | FileType::Pptx => office::detect(path, file_type),
        FileType::Jpeg => jpeg::detect(path),
        FileType::Png => png::detect(path),
        FileType::Gif => gif::detect(path),
        FileType::Pdf => pdf::detect(path),
        FileType::Other => detect_with_tool(path),
    }
}

/// Despacha la limpieza al manejador nativo del tipo clasificado.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let file_type = filetype::classify(path);
    match file_type {
        FileType::Word2003Xml => word2003::clean(path, backup),
        FileType::Rtf => rtf::clean(path, backup),
        FileType::Doc | FileType::Xls | FileType::Ppt => ole::clean(path, backup),
        FileType::Docx | FileType::Xlsx | FileType::Pptx => office::clean(path, backup),
        FileType::Jpeg => jpeg::clean(path, backup),
        FileType::Png => png::clean(path, backup),
        FileType::Gif => gif::clean(path, backup),
        FileType::Pdf => pdf::clean(path, backup),
        FileType::Other => clean_with_tool(path, file_type, backup),
    }
}

/// Para formatos sin manejador nativo la detección recae en ExifTool.
fn detect_with_tool(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Other);
    match ExifTool::probe() {
        Some(tool) => {
            let labels = tool.sensitive_labels(path);
            report.can_clean = !labels.is_empty();
            for label in labels {
                report.push_label(label);
            }
        }
        None => report.note = Some("Formato no soportado".to_string()),
    }
    report
}

/// ExifTool escribe in situ: el respaldo se crea antes y se descarta si al
/// final no hubo cambios.
fn clean_with_tool(path: &Path, file_type: FileType, backup: bool) -> Result<CleanResult, String> {
    let Some(tool) = ExifTool::probe() else {
        return Ok(CleanResult::unchanged(
            "Formato no soportado para limpieza",
        ));
    };

    let backup_path = if backup {
        Some(replace::make_backup_copy(path)?)
    } else {
        None
    };

    match tool.clean(path, file_type) {
        Ok((true, _)) => Ok(CleanResult::changed("ExifTool eliminó la metadata")),
        Ok((false, reason)) => {
            if let Some(backup_path) = backup_path {
                let _ = fs::remove_file(backup_path);
            }
            Ok(CleanResult::unchanged(reason))
        }
        Err(error) => {
            if let Some(backup_path) = backup_path {
                let _ = fs::remove_file(backup_path);
            }
            Err(error)
        }
    }
}
