//! Huellas SHA-256 calculadas solo sobre el contenido intrínseco.
//!
//! La propiedad que sostiene todo el motor: para cada formato soportado,
//! la huella de un archivo no cambia cuando la limpieza elimina únicamente
//! metadata.

use cfb::CompoundFile;
use lopdf::{Document, Object};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::cleaners::gif::strip_comments;
use crate::cleaners::jpeg;
use crate::cleaners::png::PNG_SIGNATURE;
use crate::cleaners::rtf::strip_info_groups;
use crate::cleaners::{read_error, read_full};
use crate::filetype::{FileType, classify};
use crate::report::ContentHash;

/// Streams que contienen el documento en los formatos Office heredados.
const OLE_CORE_STREAMS: [&str; 6] = [
    "worddocument",
    "0table",
    "1table",
    "workbook",
    "book",
    "powerpoint document",
];

const OLE_PROPERTY_STREAMS: [&str; 2] =
    ["\u{5}SummaryInformation", "\u{5}DocumentSummaryInformation"];

/// Calcula la huella de contenido según el tipo del archivo.
pub(crate) fn compute(path: &Path) -> Result<ContentHash, String> {
    match classify(path) {
        FileType::Jpeg => hash_jpeg_scan(path),
        FileType::Png => hash_png_idat(path),
        FileType::Gif => hash_gif_without_comments(path),
        FileType::Rtf => hash_rtf_content(path),
        FileType::Doc | FileType::Xls | FileType::Ppt => hash_ole_streams(path),
        tipo @ (FileType::Docx | FileType::Xlsx | FileType::Pptx) => hash_ooxml_parts(path, tipo),
        FileType::Word2003Xml => {
            hash_whole_file(path).map(|d| ContentHash::new(d, "Documento XML completo"))
        }
        FileType::Pdf => hash_pdf_pages(path),
        FileType::Other => {
            hash_whole_file(path).map(|d| ContentHash::new(d, "Archivo completo"))
        }
    }
}

/// SHA-256 del archivo completo, en bloques de 8 KiB.
pub(crate) fn hash_whole_file(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(bytes_read) => hasher.update(&buffer[..bytes_read]),
            Err(error) => return Err(format!("No se pudo leer el archivo: {}", error)),
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Huella desde el marcador SOS hasta el final del archivo, inclusive.
fn hash_jpeg_scan(path: &Path) -> Result<ContentHash, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let mut soi = [0_u8; 2];
    if read_full(&mut reader, &mut soi).map_err(read_error)? != 2 || soi != jpeg::SOI {
        let digest = hash_whole_file(path)?;
        return Ok(ContentHash::new(digest, "Archivo completo"));
    }

    let mut hasher = Sha256::new();
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
        if marker[1] == 0xDA {
            // El scan y todo lo que le sigue es contenido.
            hasher.update(marker);
            io::copy(&mut reader, &mut hasher)
                .map_err(|e| format!("No se pudo leer el scan: {}", e))?;
            break;
        }
        if matches!(marker[1], 0xD8 | 0xD9) {
            continue;
        }

        let mut length_bytes = [0_u8; 2];
        if read_full(&mut reader, &mut length_bytes).map_err(read_error)? != 2 {
            return Err("La estructura del JPEG está truncada".to_string());
        }
        let length = u16::from_be_bytes(length_bytes) as u64;
        if length < 2 {
            return Err("La estructura del JPEG no es válida".to_string());
        }
        let skipped = io::copy(&mut reader.by_ref().take(length - 2), &mut io::sink())
            .map_err(|e| format!("No se pudo leer el archivo: {}", e))?;
        if skipped != length - 2 {
            return Err("La estructura del JPEG está truncada".to_string());
        }
    }

    Ok(ContentHash::new(
        format!("{:x}", hasher.finalize()),
        "Datos de scan JPEG",
    ))
}

/// Huella de la concatenación de los payloads IDAT en orden de archivo.
fn hash_png_idat(path: &Path) -> Result<ContentHash, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let mut signature = [0_u8; 8];
    if read_full(&mut reader, &mut signature).map_err(read_error)? != 8
        || signature != PNG_SIGNATURE
    {
        let digest = hash_whole_file(path)?;
        return Ok(ContentHash::new(digest, "Archivo completo"));
    }

    let mut hasher = Sha256::new();
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

        let consumed = if &chunk_type == b"IDAT" {
            let copied = io::copy(&mut reader.by_ref().take(length), &mut hasher)
                .map_err(|e| format!("No se pudo leer el chunk IDAT: {}", e))?;
            // Saltar el CRC.
            copied
                + io::copy(&mut reader.by_ref().take(4), &mut io::sink())
                    .map_err(|e| format!("No se pudo leer el archivo: {}", e))?
        } else {
            io::copy(&mut reader.by_ref().take(length + 4), &mut io::sink())
                .map_err(|e| format!("No se pudo leer el archivo: {}", e))?
        };
        if consumed != length + 4 {
            return Err("La estructura del PNG está truncada".to_string());
        }
    }

    Ok(ContentHash::new(
        format!("{:x}", hasher.finalize()),
        "IDAT de PNG",
    ))
}

/// Huella del archivo con los comentarios eliminados y el framing intacto.
fn hash_gif_without_comments(path: &Path) -> Result<ContentHash, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut reader = BufReader::new(file);

    let mut hasher = Sha256::new();
    match strip_comments(&mut reader, &mut hasher)? {
        Some(_) => Ok(ContentHash::new(
            format!("{:x}", hasher.finalize()),
            "GIF sin comentarios",
        )),
        None => {
            let digest = hash_whole_file(path)?;
            Ok(ContentHash::new(digest, "Archivo completo"))
        }
    }
}

/// Huella de los bytes latin-1 tras quitar los grupos `{\info}`.
fn hash_rtf_content(path: &Path) -> Result<ContentHash, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let (stripped, _) = strip_info_groups(&bytes);
    let mut hasher = Sha256::new();
    hasher.update(&stripped);
    Ok(ContentHash::new(
        format!("{:x}", hasher.finalize()),
        "RTF sin \\info",
    ))
}

/// Huella de las partes de contenido del paquete, ordenadas por nombre.
///
/// Quedan fuera docProps, los archivos de relaciones y `[Content_Types].xml`:
/// todos cambian o desaparecen durante la limpieza.
fn hash_ooxml_parts(path: &Path, file_type: FileType) -> Result<ContentHash, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| format!("No es un documento Office válido: {}", e))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| {
            !name.starts_with("docProps/")
                && !name.ends_with(".rels")
                && !name.contains("/_rels/")
                && !name.starts_with("_rels/")
                && *name != "[Content_Types].xml"
        })
        .map(str::to_string)
        .collect();
    names.sort();

    let mut hasher = Sha256::new();
    for name in &names {
        hasher.update(name.as_bytes());
        let mut part = archive
            .by_name(name)
            .map_err(|e| format!("Error leyendo {}: {}", name, e))?;
        io::copy(&mut part, &mut hasher)
            .map_err(|e| format!("Error leyendo {}: {}", name, e))?;
    }

    let label = match file_type {
        FileType::Xlsx => "XLSX",
        FileType::Pptx => "PPTX",
        _ => "DOCX",
    };
    Ok(ContentHash::new(
        format!("{:x}", hasher.finalize()),
        format!("Partes de contenido {}", label),
    ))
}

/// Huella de los streams OLE: pares (ruta, sha256) ordenados por ruta.
///
/// Se prefiere la variante restringida a los streams principales del
/// documento; si no hay ninguno se usan todos menos los property sets.
fn hash_ole_streams(path: &Path) -> Result<ContentHash, String> {
    let file = File::open(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    let mut comp = CompoundFile::open(file)
        .map_err(|e| format!("No es un contenedor OLE válido: {}", e))?;

    let stream_paths: Vec<PathBuf> = comp
        .walk()
        .filter(|entry| entry.is_stream())
        .map(|entry| entry.path().to_path_buf())
        .collect();

    let core_paths: Vec<PathBuf> = stream_paths
        .iter()
        .filter(|stream| {
            stream_name(stream)
                .map(|name| OLE_CORE_STREAMS.contains(&name.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    let (selected, description) = if core_paths.is_empty() {
        let content: Vec<PathBuf> = stream_paths
            .into_iter()
            .filter(|stream| {
                stream_name(stream)
                    .map(|name| !OLE_PROPERTY_STREAMS.contains(&name.as_str()))
                    .unwrap_or(true)
            })
            .collect();
        (content, "Streams OLE (sin property sets)")
    } else {
        (core_paths, "Streams OLE principales")
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    for stream_path in selected {
        let mut stream = comp
            .open_stream(&stream_path)
            .map_err(|e| format!("No se pudo leer el stream OLE: {}", e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut stream, &mut hasher)
            .map_err(|e| format!("No se pudo leer el stream OLE: {}", e))?;
        let display = stream_path
            .to_string_lossy()
            .trim_start_matches('/')
            .to_string();
        pairs.push((display, format!("{:x}", hasher.finalize())));
    }
    pairs.sort();

    let mut hasher = Sha256::new();
    for (name, digest) in &pairs {
        hasher.update(name.as_bytes());
        hasher.update(digest.as_bytes());
    }
    Ok(ContentHash::new(
        format!("{:x}", hasher.finalize()),
        description,
    ))
}

fn stream_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}

/// Huella de los streams de contenido de cada página, en orden de página.
fn hash_pdf_pages(path: &Path) -> Result<ContentHash, String> {
    let doc =
        Document::load(path).map_err(|e| format!("No se pudo parsear el PDF: {}", e))?;

    let mut hasher = Sha256::new();
    for (_page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Ok(contents) = page.get(b"Contents") else {
            continue;
        };
        hash_contents_object(&doc, contents, &mut hasher);
    }

    Ok(ContentHash::new(
        format!("{:x}", hasher.finalize()),
        "Contenido de páginas PDF",
    ))
}

fn hash_contents_object(doc: &Document, object: &Object, hasher: &mut Sha256) {
    match object {
        Object::Reference(reference) => {
            if let Ok(inner) = doc.get_object(*reference) {
                hash_contents_object(doc, inner, hasher);
            }
        }
        Object::Array(items) => {
            for item in items {
                hash_contents_object(doc, item, hasher);
            }
        }
        Object::Stream(stream) => hasher.update(&stream.content),
        _ => {}
    }
}
