//! Limpieza de segmentos APPn con metadata sensible en archivos JPEG.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::cleaners::{contains_subslice, read_error, read_full};
use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

pub(crate) const SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_SOS: u8 = 0xDA;
const MARKER_APP1: u8 = 0xE1;
const MARKER_APP13: u8 = 0xED;

pub(crate) const EXIF_HEADER: &[u8] = b"Exif\x00\x00";
pub(crate) const XMP_NEEDLE: &[u8] = b"http://ns.adobe.com/xap/1.0/";
pub(crate) const PSIR_HEADER: &[u8] = b"Photoshop 3.0";

#[derive(Default)]
struct MetadataFlags {
    exif: bool,
    xmp: bool,
    iptc: bool,
}

/// Inventaría los bloques EXIF, XMP e IPTC presentes antes del scan.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Jpeg);
    match scan_segments(path) {
        Ok(flags) => {
            if flags.exif {
                report.push_label("EXIF");
            }
            if flags.xmp {
                report.push_label("XMP");
            }
            if flags.iptc {
                report.push_label("IPTC");
            }
            report.can_clean = !report.summary.is_empty();
        }
        Err(error) => report.note = Some(error),
    }
    report
}

/// Reescribe el JPEG sin los segmentos de metadata, copiando el scan intacto.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let temp_path = generate_temp_filename(path);
    let temp_file = File::create(&temp_path)
        .map_err(|e| format!("No se pudo crear el archivo temporal: {}", e))?;
    let mut writer = BufWriter::new(temp_file);

    let outcome = copy_segments(&mut reader, &mut writer);
    let flush = writer.flush();
    drop(writer);

    let dropped = match (outcome, flush) {
        (Err(error), _) => {
            discard_temp(&temp_path);
            return Err(error);
        }
        (_, Err(error)) => {
            discard_temp(&temp_path);
            return Err(format!("No se pudo escribir el archivo temporal: {}", error));
        }
        (Ok(None), _) => {
            // Estructura inesperada: nunca tocar el original.
            discard_temp(&temp_path);
            return Ok(CleanResult::unchanged(
                "La estructura del JPEG no es válida; el archivo queda sin cambios",
            ));
        }
        (Ok(Some(dropped)), _) => dropped,
    };

    if dropped == 0 {
        discard_temp(&temp_path);
        return Ok(CleanResult::unchanged(
            "No se encontró metadata en los segmentos APP",
        ));
    }

    match verify_exif_removed(&temp_path) {
        Ok(true) => {}
        Ok(false) => {
            discard_temp(&temp_path);
            return Err(
                "La verificación indicó que la metadata no se eliminó correctamente".to_string(),
            );
        }
        Err(error) => {
            discard_temp(&temp_path);
            return Err(error);
        }
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed("Se eliminaron segmentos EXIF/XMP/IPTC"))
}

/// Copia los segmentos al destino omitiendo los de metadata.
///
/// Devuelve `Ok(None)` si el framing es inválido y `Ok(Some(n))` con la
/// cantidad de segmentos descartados cuando la copia termina bien.
fn copy_segments<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
) -> Result<Option<usize>, String> {
    let mut soi = [0_u8; 2];
    if read_full(reader, &mut soi).map_err(read_error)? != 2 || soi != SOI {
        return Ok(None);
    }
    writer
        .write_all(&soi)
        .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))?;

    let mut dropped = 0_usize;
    loop {
        let mut marker = [0_u8; 2];
        match read_full(reader, &mut marker).map_err(read_error)? {
            0 => break,
            2 => {}
            _ => return Ok(None),
        }
        if marker[0] != 0xFF {
            return Ok(None);
        }

        match marker[1] {
            MARKER_SOS => {
                // Desde SOS el resto del archivo se copia tal cual.
                writer
                    .write_all(&marker)
                    .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))?;
                io::copy(reader, writer)
                    .map_err(|e| format!("No se pudo copiar el scan comprimido: {}", e))?;
                break;
            }
            0xD8 | 0xD9 => {
                writer
                    .write_all(&marker)
                    .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))?;
            }
            _ => {
                let mut length_bytes = [0_u8; 2];
                if read_full(reader, &mut length_bytes).map_err(read_error)? != 2 {
                    return Ok(None);
                }
                let length = u16::from_be_bytes(length_bytes) as usize;
                if length < 2 {
                    return Ok(None);
                }
                let mut payload = vec![0_u8; length - 2];
                if read_full(reader, &mut payload).map_err(read_error)? != payload.len() {
                    return Ok(None);
                }

                if is_metadata_segment(marker[1], &payload) {
                    dropped += 1;
                    continue;
                }

                writer
                    .write_all(&marker)
                    .and_then(|_| writer.write_all(&length_bytes))
                    .and_then(|_| writer.write_all(&payload))
                    .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))?;
            }
        }
    }

    Ok(Some(dropped))
}

/// Predicado de metadata sobre un segmento APPn.
pub(crate) fn is_metadata_segment(marker: u8, payload: &[u8]) -> bool {
    match marker {
        MARKER_APP1 => {
            payload.starts_with(EXIF_HEADER) || contains_subslice(payload, XMP_NEEDLE)
        }
        MARKER_APP13 => payload.starts_with(PSIR_HEADER),
        _ => false,
    }
}

fn scan_segments(path: &Path) -> Result<MetadataFlags, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let mut soi = [0_u8; 2];
    if read_full(&mut reader, &mut soi).map_err(read_error)? != 2 || soi != SOI {
        return Err("La cabecera JPEG no es válida".to_string());
    }

    let mut flags = MetadataFlags::default();
    loop {
        let mut marker = [0_u8; 2];
        match read_full(&mut reader, &mut marker).map_err(read_error)? {
            0 => break,
            2 => {}
            _ => return Err("La estructura del JPEG está truncada".to_string()),
        }
        if marker[0] != 0xFF {
            return Err("La estructura del JPEG no es válida".to_string());
        }
        if marker[1] == MARKER_SOS {
            break;
        }
        if matches!(marker[1], 0xD8 | 0xD9) {
            continue;
        }

        let mut length_bytes = [0_u8; 2];
        if read_full(&mut reader, &mut length_bytes).map_err(read_error)? != 2 {
            return Err("La estructura del JPEG está truncada".to_string());
        }
        let length = u16::from_be_bytes(length_bytes) as usize;
        if length < 2 {
            return Err("La estructura del JPEG no es válida".to_string());
        }
        let mut payload = vec![0_u8; length - 2];
        if read_full(&mut reader, &mut payload).map_err(read_error)? != payload.len() {
            return Err("La estructura del JPEG está truncada".to_string());
        }

        if marker[1] == MARKER_APP1 {
            if payload.starts_with(EXIF_HEADER) {
                flags.exif = true;
            }
            if contains_subslice(&payload, XMP_NEEDLE) {
                flags.xmp = true;
            }
        }
        if marker[1] == MARKER_APP13 && payload.starts_with(PSIR_HEADER) {
            flags.iptc = true;
        }
    }

    Ok(flags)
}

/// Comprueba que el temporal limpio carece de campos EXIF residuales.
fn verify_exif_removed(path: &Path) -> Result<bool, String> {
    let file = File::open(path)
        .map_err(|e| format!("No se pudo abrir el archivo limpio para verificación: {}", e))?;
    let mut reader = BufReader::new(file);

    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(exif.fields().next().is_none()),
        Err(exif::Error::NotFound(_)) | Err(exif::Error::BlankValue(_)) => Ok(true),
        Err(exif::Error::InvalidFormat(_)) => Ok(true),
        Err(exif::Error::Io(err)) => Err(format!(
            "No se pudo leer metadata EXIF durante la verificación: {}",
            err
        )),
        Err(other) => Err(format!("Error verificando metadata EXIF: {}", other)),
    }
}

