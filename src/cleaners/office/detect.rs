use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use xmltree::Element;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::filetype::FileType;
use crate::report::DetectionReport;

use super::xml::{APP_NS, CP_NS, CUSTOM_NS, DC_NS, DCTERMS_NS, count_descendants, has_child};

/// Campos de `core.xml` que se reportan, en el orden en que se muestran.
const CORE_FIELDS: [(&str, &str, &str); 8] = [
    (DC_NS, "creator", "Author"),
    (CP_NS, "lastModifiedBy", "LastModifiedBy"),
    (DCTERMS_NS, "created", "Created"),
    (DCTERMS_NS, "modified", "Modified"),
    (DC_NS, "title", "Title"),
    (DC_NS, "subject", "Subject"),
    (CP_NS, "keywords", "Keywords"),
    (CP_NS, "category", "Category"),
];

const APP_FIELDS: [(&str, &str); 3] = [
    ("Company", "Company"),
    ("Manager", "Manager"),
    ("Application", "Application"),
];

/// Inspecciona las partes docProps y arma el resumen de metadata.
pub(crate) fn detect(path: &Path, file_type: FileType) -> DetectionReport {
    let mut report = DetectionReport::new(file_type);

    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            report.note = Some(format!("No se pudo abrir el archivo: {}", error));
            return report;
        }
    };
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(error) => {
            report.note = Some(format!("No es un documento Office válido: {}", error));
            return report;
        }
    };

    let mut present = false;

    match read_part(&mut archive, "docProps/core.xml") {
        Ok(Some(contents)) => {
            present = true;
            match Element::parse(Cursor::new(&contents[..])) {
                Ok(core) => {
                    for (namespace, local, label) in CORE_FIELDS {
                        if has_child(&core, namespace, local) {
                            report.push_label(label);
                        }
                    }
                }
                Err(_) => report.push_label("CoreProps"),
            }
        }
        Ok(None) => {}
        Err(error) => {
            report.note = Some(error);
            return report;
        }
    }

    match read_part(&mut archive, "docProps/app.xml") {
        Ok(Some(contents)) => {
            present = true;
            match Element::parse(Cursor::new(&contents[..])) {
                Ok(app) => {
                    for (local, label) in APP_FIELDS {
                        if has_child(&app, APP_NS, local) {
                            report.push_label(label);
                        }
                    }
                }
                Err(_) => report.push_label("AppProps"),
            }
        }
        Ok(None) => {}
        Err(error) => {
            report.note = Some(error);
            return report;
        }
    }

    match read_part(&mut archive, "docProps/custom.xml") {
        Ok(Some(contents)) => {
            present = true;
            match Element::parse(Cursor::new(&contents[..])) {
                Ok(custom) => {
                    let count = count_descendants(&custom, CUSTOM_NS, "property");
                    if count > 0 {
                        report.push_label(format!("CustomProps:{}", count));
                    }
                }
                Err(_) => report.push_label("CustomProps"),
            }
        }
        Ok(None) => {}
        Err(error) => {
            report.note = Some(error);
            return report;
        }
    }

    let has_thumbnail = archive
        .file_names()
        .any(|name| name.starts_with("docProps/thumbnail."));
    if has_thumbnail {
        present = true;
        report.push_label("Thumbnail");
    }

    report.can_clean = present;
    report
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, String> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut contents = Vec::new();
            part.read_to_end(&mut contents)
                .map_err(|e| format!("Error leyendo {}: {}", name, e))?;
            Ok(Some(contents))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(error) => Err(format!("Error accediendo a {}: {}", name, error)),
    }
}
