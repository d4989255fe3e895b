use std::fs::File;
use std::path::Path;
use zip::ZipArchive;

/// Comprueba que el paquete reescrito ya no contiene partes docProps.
pub(crate) fn verify_docprops_removed(path: &Path) -> Result<bool, String> {
    let file = File::open(path)
        .map_err(|e| format!("No se pudo abrir archivo limpio para verificación: {}", e))?;
    let archive =
        ZipArchive::new(file).map_err(|e| format!("No es un documento Office válido: {}", e))?;

    Ok(!archive
        .file_names()
        .any(|name| name.starts_with("docProps/")))
}
