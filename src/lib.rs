//! Motor de MetaScrub: detecta, elimina y verifica metadata sensible en
//! documentos e imágenes.
//!
//! Cada archivo se clasifica por sus bytes mágicos, se inventaría su
//! metadata, se reescribe a un temporal que reemplaza al original de forma
//! atómica y, como verificación independiente, se calcula una huella de
//! contenido que no cambia cuando la limpieza solo tocó metadata.

mod cleaners;
mod exiftool;
mod filetype;
mod hashing;
mod replace;
mod report;

pub use filetype::{FileType, classify};
pub use report::{CleanResult, ContentHash, DetectionReport};

use std::path::Path;

/// Inventaría la metadata sensible presente en el archivo.
///
/// Nunca modifica el archivo; los problemas de lectura o de estructura se
/// reportan en la nota del resultado.
pub fn detect_file_metadata(path: &Path) -> DetectionReport {
    cleaners::detect(path)
}

/// Reescribe el archivo dejando solo su contenido intrínseco.
///
/// Con `backup` se conserva una copia `<ruta>.bak[.N]` del original antes
/// del reemplazo. Un archivo con estructura inválida queda sin cambios.
pub fn clean_file_metadata(path: &Path, backup: bool) -> Result<CleanResult, String> {
    cleaners::clean(path, backup)
}

/// Calcula la huella SHA-256 del contenido intrínseco del archivo.
///
/// Para los formatos soportados la huella es invariante ante la limpieza,
/// lo que permite verificar que solo se eliminó metadata.
pub fn compute_content_hash(path: &Path) -> Result<ContentHash, String> {
    hashing::compute(path)
}

/// Etiquetas sensibles según la herramienta externa; vacío si no responde.
pub fn sensitive_labels_from_tool(path: &Path) -> Vec<String> {
    match exiftool::ExifTool::probe() {
        Some(tool) => tool.sensitive_labels(path),
        None => Vec::new(),
    }
}

/// Indica qué property sets OLE existen en un documento Office heredado.
///
/// Devuelve `(false, false)` cuando el archivo no es un contenedor legible.
pub fn legacy_office_props_state(path: &Path) -> (bool, bool) {
    cleaners::ole::props_state(path).unwrap_or((false, false))
}
