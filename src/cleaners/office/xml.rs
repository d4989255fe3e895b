//! Namespaces y búsquedas sobre las partes XML de propiedades.

use xmltree::{Element, XMLNode};

pub(crate) const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub(crate) const CP_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
pub(crate) const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub(crate) const APP_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
pub(crate) const CUSTOM_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/custom-properties";
pub(crate) const CONTENT_TYPES_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";
pub(crate) const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

/// Comprueba si el elemento raíz tiene un hijo con ese namespace y nombre.
pub(crate) fn has_child(root: &Element, namespace: &str, local_name: &str) -> bool {
    root.children.iter().any(|node| {
        matches!(
            node,
            XMLNode::Element(child)
                if child.name == local_name && child.namespace.as_deref() == Some(namespace)
        )
    })
}

/// Cuenta los descendientes con ese namespace y nombre, a cualquier nivel.
pub(crate) fn count_descendants(root: &Element, namespace: &str, local_name: &str) -> usize {
    let mut count = 0;
    for node in &root.children {
        if let XMLNode::Element(child) = node {
            if child.name == local_name && child.namespace.as_deref() == Some(namespace) {
                count += 1;
            }
            count += count_descendants(child, namespace, local_name);
        }
    }
    count
}
