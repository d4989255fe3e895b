//! Reemplazo atómico de archivos con respaldos opcionales.

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Crea un nombre de archivo temporal estable en el mismo directorio que `path`.
///
/// El temporal debe vivir junto al original para que el rename final sea
/// atómico dentro del mismo sistema de archivos.
pub(crate) fn generate_temp_filename(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let extension = path.extension().unwrap_or_default().to_string_lossy();

    // Usar timestamp para evitar colisiones entre ejecuciones consecutivas.
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    parent.join(format!(".{}_temp_{}.{}", stem, timestamp, extension))
}

/// Calcula la primera ruta de respaldo libre: `<ruta>.bak`, `<ruta>.bak.1`, …
pub(crate) fn next_backup_path(path: &Path) -> PathBuf {
    let base = {
        let mut name = path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    };
    if !base.exists() {
        return base;
    }
    let mut index = 1_u32;
    loop {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".bak.{}", index));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Copia el original a su ruta de respaldo conservando permisos y mtime.
pub(crate) fn make_backup_copy(path: &Path) -> Result<PathBuf, String> {
    let backup = next_backup_path(path);
    fs::copy(path, &backup)
        .map_err(|e| format!("No se pudo crear el respaldo {}: {}", backup.display(), e))?;

    if let Ok(metadata) = fs::metadata(path) {
        let mtime = FileTime::from_last_modification_time(&metadata);
        let _ = filetime::set_file_mtime(&backup, mtime);
    }

    Ok(backup)
}

/// Promueve el temporal sobre el original, creando antes el respaldo pedido.
///
/// En caso de fallo el temporal se elimina y el original queda intacto.
pub(crate) fn replace_file(path: &Path, temp_path: &Path, backup: bool) -> Result<(), String> {
    if backup && let Err(error) = make_backup_copy(path) {
        let _ = fs::remove_file(temp_path);
        return Err(error);
    }

    fs::rename(temp_path, path).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        format!("No se pudo reemplazar el archivo original: {}", e)
    })
}

/// Elimina un temporal que no llegó a promoverse.
pub(crate) fn discard_temp(temp_path: &Path) {
    let _ = fs::remove_file(temp_path);
}
