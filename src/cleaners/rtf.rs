//! Limpieza de grupos `{\info}` en documentos RTF.

use std::fs;
use std::path::Path;

use crate::cleaners::contains_subslice;
use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

const INFO_CONTROL: &[u8] = b"\\info";

/// Controles reconocidos dentro de un grupo `\info` y su etiqueta.
const INFO_LABELS: [(&[u8], &str); 10] = [
    (b"\\author", "Author"),
    (b"\\company", "Company"),
    (b"\\title", "Title"),
    (b"\\subject", "Subject"),
    (b"\\keywords", "Keywords"),
    (b"\\operator", "Operator"),
    (b"\\category", "Category"),
    (b"\\doccomm", "Comment"),
    (b"\\creatim", "CreateTime"),
    (b"\\revtim", "ModTime"),
];

/// Reporta los sub-controles de metadata hallados en los grupos `\info`.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Rtf);
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) => {
            report.note = Some(format!("No se pudo abrir el archivo: {}", error));
            return report;
        }
    };

    for block in info_groups(&bytes) {
        for (control, label) in INFO_LABELS {
            if contains_subslice(block, control) {
                report.push_label(label);
            }
        }
    }
    report.can_clean = !report.summary.is_empty();
    report
}

/// Elimina todos los grupos `{\info …}` conservando el resto byte a byte.
///
/// El archivo se trata como bytes latin-1: nunca se transcodifica y los
/// finales de línea quedan tal como estaban.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;

    let (stripped, changed) = strip_info_groups(&bytes);
    if !changed {
        return Ok(CleanResult::unchanged("No se encontraron grupos \\info"));
    }

    let temp_path = generate_temp_filename(path);
    if let Err(error) = fs::write(&temp_path, &stripped) {
        discard_temp(&temp_path);
        return Err(format!("No se pudo escribir el archivo temporal: {}", error));
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed("Se eliminaron los grupos \\info del RTF"))
}

/// Devuelve los grupos `{\info …}` completos encontrados a cualquier nivel.
fn info_groups(bytes: &[u8]) -> Vec<&[u8]> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1..].starts_with(INFO_CONTROL) {
            let end = skip_group(bytes, i + 1);
            blocks.push(&bytes[i..end]);
            i = end;
            continue;
        }
        i += 1;
    }
    blocks
}

/// Copia el documento omitiendo cada grupo `{\info …}`.
pub(crate) fn strip_info_groups(bytes: &[u8]) -> (Vec<u8>, bool) {
    let mut output = Vec::with_capacity(bytes.len());
    let mut changed = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1..].starts_with(INFO_CONTROL) {
            i = skip_group(bytes, i + 1);
            changed = true;
            continue;
        }
        // Copia normal respetando la pareja de bytes de un escape.
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            output.push(bytes[i]);
            output.push(bytes[i + 1]);
            i += 2;
        } else {
            output.push(bytes[i]);
            i += 1;
        }
    }
    (output, changed)
}

/// Avanza hasta cerrar el grupo abierto en `start`, con manejo de escapes.
///
/// Tras una barra invertida el byte siguiente se consume sin interpretarlo
/// como llave, de modo que `\{` y `\}` no alteran la profundidad.
fn skip_group(bytes: &[u8], start: usize) -> usize {
    let mut depth = 1_usize;
    let mut j = start;
    while j < bytes.len() && depth > 0 {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        j += 1;
    }
    j.min(bytes.len())
}
