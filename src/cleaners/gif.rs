//! Limpieza de extensiones de comentario en archivos GIF.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::cleaners::{read_error, read_full};
use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

const BLOCK_TRAILER: u8 = 0x3B;
const BLOCK_IMAGE: u8 = 0x2C;
const BLOCK_EXTENSION: u8 = 0x21;
const LABEL_COMMENT: u8 = 0xFE;

/// Cuenta las extensiones de comentario presentes en el archivo.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Gif);
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            report.note = Some(format!("No se pudo abrir el archivo: {}", error));
            return report;
        }
    };
    let mut reader = BufReader::new(file);

    match strip_comments(&mut reader, &mut io::sink()) {
        Ok(Some(comments)) => {
            if comments > 0 {
                report.push_label(format!("Comments:{}", comments));
            }
            report.can_clean = comments > 0;
        }
        Ok(None) => {
            report.note = Some("La estructura del GIF no es válida".to_string());
        }
        Err(error) => report.note = Some(error),
    }
    report
}

/// Reescribe el GIF sin extensiones de comentario; aborta ante bytes inesperados.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let temp_path = generate_temp_filename(path);
    let temp_file = File::create(&temp_path)
        .map_err(|e| format!("No se pudo crear el archivo temporal: {}", e))?;
    let mut writer = BufWriter::new(temp_file);

    let outcome = strip_comments(&mut reader, &mut writer);
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
                "La estructura del GIF no es válida; el archivo queda sin cambios",
            ));
        }
        (Ok(Some(dropped)), _) => dropped,
    };

    if dropped == 0 {
        discard_temp(&temp_path);
        return Ok(CleanResult::unchanged("No se encontraron comentarios"));
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed("Se eliminaron las extensiones de comentario"))
}

/// Recorre la estructura del GIF copiando todo excepto los comentarios.
///
/// Devuelve `Ok(None)` ante un introductor de bloque desconocido o un
/// framing truncado, para que el llamador descarte la salida.
pub(crate) fn strip_comments<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
) -> Result<Option<usize>, String> {
    let mut header = [0_u8; 6];
    if read_full(reader, &mut header).map_err(read_error)? != 6
        || (&header != b"GIF87a" && &header != b"GIF89a")
    {
        return Ok(None);
    }
    write_out(writer, &header)?;

    let mut screen_descriptor = [0_u8; 7];
    if read_full(reader, &mut screen_descriptor).map_err(read_error)? != 7 {
        return Ok(None);
    }
    write_out(writer, &screen_descriptor)?;

    let packed = screen_descriptor[4];
    if packed & 0x80 != 0 {
        let gct_len = color_table_len(packed);
        if !copy_exact(reader, writer, gct_len)? {
            return Ok(None);
        }
    }

    let mut dropped = 0_usize;
    loop {
        let mut introducer = [0_u8; 1];
        if read_full(reader, &mut introducer).map_err(read_error)? != 1 {
            break;
        }

        match introducer[0] {
            BLOCK_TRAILER => {
                write_out(writer, &introducer)?;
                break;
            }
            BLOCK_IMAGE => {
                write_out(writer, &introducer)?;

                let mut descriptor = [0_u8; 9];
                if read_full(reader, &mut descriptor).map_err(read_error)? != 9 {
                    return Ok(None);
                }
                write_out(writer, &descriptor)?;

                let mut local_packed = [0_u8; 1];
                if read_full(reader, &mut local_packed).map_err(read_error)? != 1 {
                    return Ok(None);
                }
                write_out(writer, &local_packed)?;

                if local_packed[0] & 0x80 != 0 {
                    let lct_len = color_table_len(local_packed[0]);
                    if !copy_exact(reader, writer, lct_len)? {
                        return Ok(None);
                    }
                }

                // Tamaño mínimo de código LZW.
                let mut min_code = [0_u8; 1];
                if read_full(reader, &mut min_code).map_err(read_error)? != 1 {
                    return Ok(None);
                }
                write_out(writer, &min_code)?;

                if !copy_sub_blocks(reader, writer)? {
                    return Ok(None);
                }
            }
            BLOCK_EXTENSION => {
                let mut label = [0_u8; 1];
                if read_full(reader, &mut label).map_err(read_error)? != 1 {
                    return Ok(None);
                }

                if label[0] == LABEL_COMMENT {
                    if !copy_sub_blocks(reader, &mut io::sink())? {
                        return Ok(None);
                    }
                    dropped += 1;
                } else {
                    write_out(writer, &introducer)?;
                    write_out(writer, &label)?;
                    if !copy_sub_blocks(reader, writer)? {
                        return Ok(None);
                    }
                }
            }
            _ => return Ok(None),
        }
    }

    Ok(Some(dropped))
}

fn color_table_len(packed: u8) -> u64 {
    3 * (1_u64 << ((packed & 0x07) as u32 + 1))
}

/// Copia la secuencia de sub-bloques hasta el terminador de longitud cero.
fn copy_sub_blocks<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<bool, String> {
    loop {
        let mut size = [0_u8; 1];
        if read_full(reader, &mut size).map_err(read_error)? != 1 {
            return Ok(false);
        }
        write_out(writer, &size)?;
        if size[0] == 0 {
            return Ok(true);
        }
        if !copy_exact(reader, writer, size[0] as u64)? {
            return Ok(false);
        }
    }
}

fn copy_exact<R: Read, W: Write>(reader: &mut R, writer: &mut W, len: u64) -> Result<bool, String> {
    let copied = io::copy(&mut reader.by_ref().take(len), writer)
        .map_err(|e| format!("No se pudo copiar el bloque: {}", e))?;
    Ok(copied == len)
}

fn write_out<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), String> {
    writer
        .write_all(bytes)
        .map_err(|e| format!("No se pudo escribir el archivo temporal: {}", e))
}
