use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Destino de una parte del paquete durante la reescritura.
pub(crate) enum PartAction {
    Keep(Vec<u8>),
    Replace(Vec<u8>),
    Drop,
}

/// Reescribe un paquete Office aplicando una transformación por parte.
///
/// Las partes conservadas mantienen su nombre, permisos y fecha; todas se
/// recomprimen con DEFLATE. Devuelve `(hubo_cambios, partes_descartadas)`.
pub(crate) fn rewrite_package<F>(
    path: &Path,
    output_path: &Path,
    mut transform: F,
) -> Result<(bool, usize), String>
where
    F: FnMut(&str, Vec<u8>) -> Result<PartAction, String>,
{
    let source_file =
        File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut archive = ZipArchive::new(source_file)
        .map_err(|e| format!("No es un documento Office válido: {}", e))?;

    let target_file = File::create(output_path)
        .map_err(|e| format!("No se pudo crear archivo limpio: {}", e))?;
    let mut writer = ZipWriter::new(target_file);

    let mut modified_any = false;
    let mut dropped = 0_usize;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| format!("Error leyendo archivo del ZIP: {}", e))?;
        let name = file.name().to_string();

        let mut options =
            FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Deflated);
        if let Some(mode) = file.unix_mode() {
            options = options.unix_permissions(mode);
        }
        if let Some(time) = file.last_modified() {
            options = options.last_modified_time(time);
        }

        if file.is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|e| format!("Error creando directorio en ZIP: {}", e))?;
            continue;
        }

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| format!("Error leyendo contenido: {}", e))?;

        let data_to_write = match transform(&name, contents)? {
            PartAction::Keep(data) => data,
            PartAction::Replace(data) => {
                modified_any = true;
                data
            }
            PartAction::Drop => {
                modified_any = true;
                dropped += 1;
                continue;
            }
        };

        writer
            .start_file(name, options)
            .map_err(|e| format!("Error escribiendo contenido: {}", e))?;
        writer
            .write_all(&data_to_write)
            .map_err(|e| format!("Error escribiendo contenido: {}", e))?;
    }

    writer
        .finish()
        .map_err(|e| format!("Error finalizando archivo: {}", e))?;

    Ok((modified_any, dropped))
}
