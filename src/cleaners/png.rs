//! Limpieza de chunks textuales y de fecha en archivos PNG.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::cleaners::{read_error, read_full};
use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

pub(crate) const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunks que solo transportan metadata y pueden descartarse sin riesgo.
fn is_metadata_chunk(chunk_type: &[u8; 4]) -> bool {
    matches!(chunk_type, b"tEXt" | b"iTXt" | b"zTXt" | b"tIME")
}

/// Cuenta los chunks de texto y de fecha presentes en el archivo.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Png);
    match count_metadata_chunks(path) {
        Ok((text_chunks, time_chunks)) => {
            if text_chunks > 0 {
                report.push_label(format!("Text chunks:{}", text_chunks));
            }
            if time_chunks > 0 {
                report.push_label("tIME");
            }
            report.can_clean = text_chunks > 0 || time_chunks > 0;
        }
        Err(error) => report.note = Some(error),
    }
    report
}

/// Reescribe el PNG descartando los chunks de metadata, con CRCs intactos.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let temp_path = generate_temp_filename(path);
    let temp_file = File::create(&temp_path)
        .map_err(|e| format!("No se pudo crear el archivo temporal: {}", e))?;
    let mut writer = BufWriter::new(temp_file);

    let outcome = copy_chunks(&mut reader, &mut writer);
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
            discard_temp(&temp_path);
            return Ok(CleanResult::unchanged(
                "La estructura del PNG no es válida; el archivo queda sin cambios",
            ));
        }
        (Ok(Some(dropped)), _) => dropped,
    };

    if dropped == 0 {
        discard_temp(&temp_path);
        return Ok(CleanResult::unchanged("No se encontraron chunks de metadata"));
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed("Se eliminaron chunks de texto y fecha"))
}

fn copy_chunks<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<Option<usize>, String> {
    let mut signature = [0_u8; 8];
    if read_full(reader, &mut signature).map_err(read_error)? != 8 || signature != PNG_SIGNATURE {
        return Ok(None);
    }
    writer
        .write_all(&signature)
        .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))?;

    let mut dropped = 0_usize;
    loop {
        let mut length_bytes = [0_u8; 4];
        match read_full(reader, &mut length_bytes).map_err(read_error)? {
            0 => break,
            4 => {}
            _ => return Ok(None),
        }
        let length = u32::from_be_bytes(length_bytes) as u64;

        let mut chunk_type = [0_u8; 4];
        if read_full(reader, &mut chunk_type).map_err(read_error)? != 4 {
            return Ok(None);
        }

        if is_metadata_chunk(&chunk_type) {
            // Saltar datos + CRC sin copiarlos.
            let skipped = io::copy(&mut reader.by_ref().take(length + 4), &mut io::sink())
                .map_err(|e| format!("No se pudo leer el archivo: {}", e))?;
            if skipped != length + 4 {
                return Ok(None);
            }
            dropped += 1;
            continue;
        }

        writer
            .write_all(&length_bytes)
            .and_then(|_| writer.write_all(&chunk_type))
            .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))?;
        let copied = io::copy(&mut reader.by_ref().take(length + 4), writer)
            .map_err(|e| format!("No se pudo copiar el chunk: {}", e))?;
        if copied != length + 4 {
            return Ok(None);
        }
    }

    Ok(Some(dropped))
}

fn count_metadata_chunks(path: &Path) -> Result<(usize, usize), String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let mut signature = [0_u8; 8];
    if read_full(&mut reader, &mut signature).map_err(read_error)? != 8
        || signature != PNG_SIGNATURE
    {
        return Err("La firma PNG no es válida".to_string());
    }

    let mut text_chunks = 0_usize;
    let mut time_chunks = 0_usize;
    loop {
        let mut length_bytes = [0_u8; 4];
        match read_full(&mut reader, &mut length_bytes).map_err(read_error)? {
            0 => break,
            4 => {}
            _ => return Err("La estructura del PNG está truncada".to_string()),
        }
        let length = u32::from_be_bytes(length_bytes) as u64;

        let mut chunk_type = [0_u8; 4];
        if read_full(&mut reader, &mut chunk_type).map_err(read_error)? != 4 {
            return Err("La estructura del PNG está truncada".to_string());
        }

        match &chunk_type {
            b"tEXt" | b"iTXt" | b"zTXt" => text_chunks += 1,
            b"tIME" => time_chunks += 1,
            _ => {}
        }

        let skipped = io::copy(&mut reader.by_ref().take(length + 4), &mut io::sink())
            .map_err(|e| format!("No se pudo leer el archivo: {}", e))?;
        if skipped != length + 4 {
            return Err("La estructura del PNG está truncada".to_string());
        }
    }

    Ok((text_chunks, time_chunks))
}
