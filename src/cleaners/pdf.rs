//! Detección y limpieza de metadata en PDF: diccionario Info y stream XMP.

use lopdf::{Dictionary, Document, Object};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::cleaners::contains_subslice;
use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

const QUICK_SCAN_LEN: usize = 65536;

/// Claves estándar del diccionario Info; cualquier otra cuenta como CustomInfo.
const STANDARD_INFO_KEYS: [(&[u8], &str); 8] = [
    (b"Title", "Title"),
    (b"Author", "Author"),
    (b"Subject", "Subject"),
    (b"Keywords", "Keywords"),
    (b"Creator", "Creator"),
    (b"Producer", "Producer"),
    (b"CreationDate", "CreationDate"),
    (b"ModDate", "ModDate"),
];

/// Predicados XMP que se buscan textualmente dentro del stream Metadata.
const XMP_PREDICATES: [(&str, &str); 7] = [
    ("dc:title", "Title"),
    ("dc:creator", "Author"),
    ("xmp:CreatorTool", "CreatorTool"),
    ("pdf:Producer", "Producer"),
    ("xmp:CreateDate", "CreateDate"),
    ("xmp:ModifyDate", "ModifyDate"),
    ("xmpMM:DocumentID", "DocumentID"),
];

/// Enumera las entradas del diccionario Info y los predicados del XMP.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Pdf);

    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(_) => return detect_quick(path),
    };

    let mut present = false;

    if let Ok(info_ref) = doc.trailer.get(b"Info")
        && let Some(info_dict) = deref_dictionary(&doc, info_ref)
    {
        for (key, _value) in info_dict.iter() {
            present = true;
            match STANDARD_INFO_KEYS
                .iter()
                .find(|(standard, _)| *standard == key.as_slice())
            {
                Some((_, label)) => report.push_label(*label),
                None => report.push_label("CustomInfo"),
            }
        }
    }

    if let Some(packet) = extract_xmp_packet(&doc) {
        present = true;
        let before = report.summary.len();
        for (needle, label) in XMP_PREDICATES {
            if packet.contains(needle) {
                report.push_label(label);
            }
        }
        if report.summary.len() == before {
            report.push_label("XMP");
        }
    }

    report.can_clean = present;
    report
}

/// Detector de mejor esfuerzo cuando el PDF no se puede parsear.
fn detect_quick(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::with_note(
        FileType::Pdf,
        "El PDF no se pudo parsear; la detección es aproximada y no se puede limpiar",
    );

    let mut head = vec![0_u8; QUICK_SCAN_LEN];
    let filled = File::open(path)
        .and_then(|mut file| {
            let mut total = 0;
            while total < head.len() {
                let bytes_read = file.read(&mut head[total..])?;
                if bytes_read == 0 {
                    break;
                }
                total += bytes_read;
            }
            Ok(total)
        })
        .unwrap_or(0);
    head.truncate(filled);

    if contains_subslice(&head, b"/Metadata")
        || contains_subslice(&head, b"xpacket")
        || contains_subslice(&head, b"/Info")
    {
        report.push_label("Metadata detected");
    }
    report
}

/// Vacía el diccionario Info y quita la referencia Metadata del catálogo.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let mut doc = Document::load(path)
        .map_err(|e| format!("No se pudo parsear el PDF: {}", e))?;

    let mut changed = false;

    if let Some(info_entry) = doc.trailer.get(b"Info").ok().cloned() {
        match info_entry {
            Object::Reference(id) => {
                if let Ok(object) = doc.get_object_mut(id)
                    && let Ok(dict) = object.as_dict_mut()
                    && dict.len() > 0
                {
                    *dict = Dictionary::new();
                    changed = true;
                }
            }
            Object::Dictionary(dict) => {
                if dict.len() > 0 {
                    doc.trailer.set("Info", Object::Dictionary(Dictionary::new()));
                    changed = true;
                }
            }
            _ => {}
        }
    }

    if let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference)
        && let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut)
        && catalog.remove(b"Metadata").is_some()
    {
        changed = true;
    }

    if !changed {
        return Ok(CleanResult::unchanged(
            "No había diccionario Info con entradas ni stream XMP",
        ));
    }

    let temp_path = generate_temp_filename(path);
    if let Err(error) = doc.save(&temp_path) {
        discard_temp(&temp_path);
        return Err(format!("No se pudo guardar el PDF limpio: {}", error));
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed("Se eliminaron Info y XMP del PDF"))
}

pub(crate) fn deref_dictionary<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(reference) => doc.get_dictionary(*reference).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn deref_stream<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a lopdf::Stream> {
    match obj {
        Object::Reference(reference) => doc
            .get_object(*reference)
            .ok()
            .and_then(|inner| inner.as_stream().ok()),
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

/// Extrae el paquete XMP referenciado por el catálogo, si existe.
fn extract_xmp_packet(doc: &Document) -> Option<String> {
    let catalog = doc.catalog().ok()?;
    let metadata_obj = catalog.get(b"Metadata").ok()?;
    let stream = deref_stream(doc, metadata_obj)?;
    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    Some(String::from_utf8_lossy(&content).to_string())
}
