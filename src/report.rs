//! Modelos compartidos para reportar los resultados del motor de limpieza.

use serde::{Deserialize, Serialize};

use crate::filetype::FileType;

/// Inventario de metadata detectada en un archivo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionReport {
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub can_clean: bool,
    pub summary: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DetectionReport {
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            can_clean: false,
            summary: Vec::new(),
            note: None,
        }
    }

    /// Agrega una etiqueta al resumen conservando el orden y sin duplicados.
    pub(crate) fn push_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.summary.iter().any(|existing| *existing == label) {
            self.summary.push(label);
        }
    }

    pub(crate) fn with_note(file_type: FileType, note: impl Into<String>) -> Self {
        let mut report = Self::new(file_type);
        report.note = Some(note.into());
        report
    }
}

/// Resultado de una pasada de limpieza sobre un archivo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanResult {
    pub changed: bool,
    pub reason: String,
}

impl CleanResult {
    pub(crate) fn changed(reason: impl Into<String>) -> Self {
        Self {
            changed: true,
            reason: reason.into(),
        }
    }

    pub(crate) fn unchanged(reason: impl Into<String>) -> Self {
        Self {
            changed: false,
            reason: reason.into(),
        }
    }
}

/// Huella SHA-256 calculada únicamente sobre el contenido intrínseco.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentHash {
    pub digest: String,
    pub description: String,
}

impl ContentHash {
    pub(crate) fn new(digest: String, description: impl Into<String>) -> Self {
        Self {
            digest,
            description: description.into(),
        }
    }
}
