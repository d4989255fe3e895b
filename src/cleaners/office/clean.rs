use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use xmltree::{Element, EmitterConfig, XMLNode};
use zip::ZipArchive;

use crate::replace::{discard_temp, generate_temp_filename, replace_file};
use crate::report::CleanResult;

use super::archive::{PartAction, rewrite_package};
use super::verify::verify_docprops_removed;
use super::xml::{CONTENT_TYPES_NS, RELATIONSHIPS_NS};

/// Partes del paquete que solo transportan metadata del documento.
pub(crate) fn is_docprops_part(name: &str) -> bool {
    matches!(
        name,
        "docProps/core.xml" | "docProps/app.xml" | "docProps/custom.xml"
    ) || name.starts_with("docProps/thumbnail.")
}

/// Elimina las partes docProps y sus referencias, dejando el contenido intacto.
pub(crate) fn clean(path: &Path, backup: bool) -> Result<CleanResult, String> {
    // Contenedor ilegible: nunca tocar el original.
    match File::open(path).map(ZipArchive::new) {
        Ok(Ok(_)) => {}
        Ok(Err(error)) => {
            return Ok(CleanResult::unchanged(format!(
                "No es un documento Office válido: {}",
                error
            )));
        }
        Err(error) => return Err(format!("No se pudo abrir el archivo: {}", error)),
    }

    let temp_path = generate_temp_filename(path);

    let rewrite = rewrite_package(path, &temp_path, |name, contents| {
        if is_docprops_part(name) {
            return Ok(PartAction::Drop);
        }
        match name {
            "[Content_Types].xml" => strip_docprops_overrides(contents)
                .map_err(|e| format!("[Content_Types].xml: {}", e)),
            "_rels/.rels" => {
                strip_docprops_relationships(contents).map_err(|e| format!("_rels/.rels: {}", e))
            }
            _ => Ok(PartAction::Keep(contents)),
        }
    });

    let (changed, dropped) = match rewrite {
        Ok(result) => result,
        Err(error) => {
            discard_temp(&temp_path);
            return Err(error);
        }
    };

    if !changed {
        discard_temp(&temp_path);
        return Ok(CleanResult::unchanged("No hay partes docProps presentes"));
    }

    match verify_docprops_removed(&temp_path) {
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
    Ok(CleanResult::changed(format!(
        "Se eliminaron {} partes docProps",
        dropped
    )))
}

/// Quita de `[Content_Types].xml` los Override que apuntan a docProps.
fn strip_docprops_overrides(contents: Vec<u8>) -> Result<PartAction, String> {
    rewrite_references(contents, |element| {
        element.name == "Override"
            && element.namespace.as_deref() == Some(CONTENT_TYPES_NS)
            && element
                .attributes
                .get("PartName")
                .is_some_and(|part| part.starts_with("/docProps/"))
    })
}

/// Quita de `_rels/.rels` las Relationship con destino en docProps.
fn strip_docprops_relationships(contents: Vec<u8>) -> Result<PartAction, String> {
    rewrite_references(contents, |element| {
        element.name == "Relationship"
            && element.namespace.as_deref() == Some(RELATIONSHIPS_NS)
            && element
                .attributes
                .get("Target")
                .is_some_and(|target| target.starts_with("docProps/"))
    })
}

fn rewrite_references<F>(contents: Vec<u8>, mut should_remove: F) -> Result<PartAction, String>
where
    F: FnMut(&Element) -> bool,
{
    let mut root = Element::parse(Cursor::new(&contents[..]))
        .map_err(|e| format!("Error leyendo XML de referencias: {}", e))?;

    let before = root.children.len();
    root.children
        .retain(|node| !matches!(node, XMLNode::Element(child) if should_remove(child)));

    if root.children.len() == before {
        return Ok(PartAction::Keep(contents));
    }

    let mut output = Vec::new();
    let mut config = EmitterConfig::new();
    config.perform_indent = false;
    config.write_document_declaration = true;
    root.write_with_config(&mut output, config)
        .map_err(|e| format!("Error escribiendo XML de referencias: {}", e))?;

    Ok(PartAction::Replace(output))
}
