//! Limpieza de propiedades de documento en XML de Word 2003 (WordprocessingML).

use std::fs;
use std::io::Cursor;
use std::path::Path;
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::filetype::FileType;
use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::{CleanResult, DetectionReport};

const OFFICE_NS: &str = "urn:schemas-microsoft-com:office:office";

/// Lista las propiedades declaradas bajo `o:DocumentProperties`.
pub(crate) fn detect(path: &Path) -> DetectionReport {
    let mut report = DetectionReport::new(FileType::Word2003Xml);

    let root = match parse_document(path) {
        Ok(root) => root,
        Err(error) => {
            report.note = Some(error);
            return report;
        }
    };

    if let Some(props) = find_descendant(&root, "DocumentProperties") {
        for node in &props.children {
            if let XMLNode::Element(child) = node {
                report.push_label(child.name.clone());
            }
        }
    }
    if find_descendant(&root, "CustomDocumentProperties").is_some() {
        report.push_label("CustomDocumentProperties");
    }

    report.can_clean = !report.summary.is_empty();
    report
}

/// Elimina todas las propiedades del documento dondequiera que aparezcan.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    let mut root = match parse_document(path) {
        Ok(root) => root,
        Err(error) => return Ok(CleanResult::unchanged(error)),
    };

    let removed = remove_property_elements(&mut root);
    if removed == 0 {
        return Ok(CleanResult::unchanged(
            "No se encontraron propiedades de Office 2003",
        ));
    }

    let mut output = Vec::new();
    let mut config = EmitterConfig::new();
    config.perform_indent = false;
    config.write_document_declaration = true;
    root.write_with_config(&mut output, config)
        .map_err(|e| format!("Error escribiendo el XML limpio: {}", e))?;

    let temp_path = generate_temp_filename(path);
    if let Err(error) = fs::write(&temp_path, &output) {
        discard_temp(&temp_path);
        return Err(format!("No se pudo escribir el archivo temporal: {}", error));
    }

    replace_file(path, &temp_path, backup)?;
    Ok(CleanResult::changed(
        "Se eliminaron las propiedades del XML de Office 2003",
    ))
}

fn parse_document(path: &Path) -> Result<Element, String> {
    let bytes = fs::read(path).map_err(|e| format!("No se pudo abrir el archivo: {}", e))?;
    Element::parse(Cursor::new(bytes))
        .map_err(|e| format!("Error leyendo el XML del documento: {}", e))
}

fn is_property_element(element: &Element) -> bool {
    element.namespace.as_deref() == Some(OFFICE_NS)
        && matches!(
            element.name.as_str(),
            "DocumentProperties" | "CustomDocumentProperties"
        )
}

/// Quita cada elemento de propiedades sin importar el padre que lo contiene.
fn remove_property_elements(element: &mut Element) -> usize {
    let before = element.children.len();
    element
        .children
        .retain(|node| !matches!(node, XMLNode::Element(child) if is_property_element(child)));
    let mut removed = before - element.children.len();

    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            removed += remove_property_elements(child);
        }
    }
    removed
}

fn find_descendant<'a>(element: &'a Element, local_name: &str) -> Option<&'a Element> {
    for node in &element.children {
        if let XMLNode::Element(child) = node {
            if child.namespace.as_deref() == Some(OFFICE_NS) && child.name == local_name {
                return Some(child);
            }
            if let Some(found) = find_descendant(child, local_name) {
                return Some(found);
            }
        }
    }
    None
}
