//! Limpieza de property sets OLE en documentos Office heredados (doc/xls/ppt).

use cfb::CompoundFile;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

/// Streams de propiedades en la raíz del almacenamiento compuesto.
const SUMMARY_STREAM: &str = "/\u{5}SummaryInformation";
const DOC_SUMMARY_STREAM: &str = "/\u{5}DocumentSummaryInformation";

/// Indica qué property sets existen en la raíz del contenedor.
pub(crate) fn props_state(path: &Path) -> Result<(bool, bool), String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let comp = CompoundFile::open(file)
        .map_err(|e| format!("No es un contenedor OLE válido: {}", e))?;
    Ok((
        comp.is_stream(SUMMARY_STREAM),
        comp.is_stream(DOC_SUMMARY_STREAM),
    ))
}

/// Reporta la presencia de los dos property sets del documento.
pub(crate) fn detect(path: &Path, file_type: FileType) -> DetectionReport {
    let mut report = DetectionReport::new(file_type);
    match props_state(path) {
        Ok((has_summary, has_doc_summary)) => {
            if has_summary {
                report.push_label("SummaryInfo");
            }
            if has_doc_summary {
                report.push_label("DocSummaryInfo");
            }
            report.can_clean = true;
        }
        Err(error) => {
            report.note = Some(error);
        }
    }
    report
}

/// Elimina los property sets reescribiendo una copia y promoviéndola.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let (has_summary, has_doc_summary) = match props_state(path) {
        Ok(state) => state,
        Err(error) => {
            // Contenedor ilegible: nunca tocar el original.
            return Ok(CleanResult::unchanged(error));
        }
    };

    if !has_summary && !has_doc_summary {
        return Ok(CleanResult::unchanged("No hay property sets OLE presentes"));
    }

    let temp_path = generate_temp_filename(path);
    fs::copy(path, &temp_path)
        .map_err(|e| format!("No se pudo crear el archivo temporal: {}", e))?;

    if let Err(error) = remove_property_streams(&temp_path) {
        discard_temp(&temp_path);
        return Err(error);
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed("Se eliminaron los property sets OLE"))
}

fn remove_property_streams(path: &Path) -> Result<(), String> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| format!("No se pudo abrir el archivo temporal: {}", e))?;
    let mut comp = CompoundFile::open(file)
        .map_err(|e| format!("No es un contenedor OLE válido: {}", e))?;

    for stream in [SUMMARY_STREAM, DOC_SUMMARY_STREAM] {
        if comp.is_stream(stream) {
            comp.remove_stream(stream)
                .map_err(|e| format!("No se pudo eliminar el stream de propiedades: {}", e))?;
        }
    }

    comp.flush()
        .map_err(|e| format!("No se pudo finalizar el contenedor OLE: {}", e))
}
