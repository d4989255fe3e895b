//! Puente opcional hacia ExifTool como proveedor externo de metadata.

use serde_json::Value;
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::filetype::FileType;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const DETECT_TIMEOUT: Duration = Duration::from_secs(20);
const CLEAN_TIMEOUT: Duration = Duration::from_secs(120);

/// Solo estas etiquetas se reportan: son las que suelen exponer autoría,
/// organización o ubicación.
const SENSITIVE_KEYS: [&str; 25] = [
    "Author",
    "Creator",
    "Producer",
    "Title",
    "Subject",
    "Keywords",
    "CreatorTool",
    "CreateDate",
    "ModifyDate",
    "LastModifiedBy",
    "Company",
    "Manager",
    "Category",
    "DocSecurity",
    "Application",
    "OwnerName",
    "Artist",
    "Copyright",
    "XPAuthor",
    "XPComment",
    "XPKeywords",
    "Make",
    "Model",
    "GPSLatitude",
    "GPSLongitude",
];

/// Capacidad externa disponible solo cuando el ejecutable responde.
pub(crate) struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    /// Localiza un ejecutable funcional siguiendo el orden de descubrimiento:
    /// junto al binario, en el PATH y en el perfil del usuario.
    pub(crate) fn probe() -> Option<Self> {
        for candidate in candidate_paths() {
            if let Ok(output) =
                run_with_timeout(Command::new(&candidate).arg("-ver"), PROBE_TIMEOUT)
                && output.success
                && !output.stdout.trim().is_empty()
            {
                return Some(Self { program: candidate });
            }
        }
        None
    }

    /// Devuelve los tags reportados por ExifTool como pares nombre → valor.
    pub(crate) fn detect(&self, path: &Path) -> Result<Vec<(String, String)>, String> {
        let output = run_with_timeout(
            Command::new(&self.program)
                .args(["-j", "-a", "-G1", "-s"])
                .arg(path),
            DETECT_TIMEOUT,
        )?;
        if !output.success {
            return Err(format!("ExifTool terminó con error: {}", output.tail()));
        }

        let parsed: Value = serde_json::from_str(&output.stdout)
            .map_err(|e| format!("No se pudo interpretar la salida de ExifTool: {}", e))?;

        let mut tags = Vec::new();
        if let Some(first) = parsed.as_array().and_then(|items| items.first())
            && let Some(map) = first.as_object()
        {
            for (key, value) in map {
                // Los nombres llegan como 'XMP:CreatorTool' o 'PDF:Producer'.
                let label = key.rsplit(':').next().unwrap_or(key).to_string();
                tags.push((label, value_to_display(value)));
            }
        }
        Ok(tags)
    }

    /// Filtra la detección al conjunto fijo de etiquetas sensibles.
    pub(crate) fn sensitive_labels(&self, path: &Path) -> Vec<String> {
        let Ok(tags) = self.detect(path) else {
            return Vec::new();
        };

        let mut labels = Vec::new();
        for (label, value) in tags {
            if SENSITIVE_KEYS.contains(&label.as_str())
                && !value.is_empty()
                && value != "0"
                && !labels.contains(&label)
            {
                labels.push(label);
            }
        }
        labels
    }

    /// Limpieza in situ; para `.doc` heredado borra los property sets explícitos.
    pub(crate) fn clean(
        &self,
        path: &Path,
        file_type: FileType,
    ) -> Result<(bool, String), String> {
        let mut command = Command::new(&self.program);
        command.arg("-overwrite_original");
        if file_type == FileType::Doc {
            command.args(["-SummaryInfo:All=", "-DocSummaryInfo:All="]);
        } else {
            command.arg("-all=");
        }
        command.arg(path);

        let output = run_with_timeout(&mut command, CLEAN_TIMEOUT)?;
        let combined = format!("{}\n{}", output.stdout, output.stderr).to_lowercase();

        if !output.success {
            return Err(format!("ExifTool terminó con error: {}", output.tail()));
        }
        if combined.contains("updated") {
            return Ok((true, String::new()));
        }
        if combined.contains("unchanged") || combined.contains("nothing to do") {
            return Ok((
                false,
                "ExifTool no encontró metadata que eliminar".to_string(),
            ));
        }
        Ok((false, "ExifTool no reportó cambios".to_string()))
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(exe) = env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(dir.join(tool_binary_name()));
    }

    // Resolución vía PATH.
    candidates.push(PathBuf::from(tool_binary_name()));

    if let Some(home) = env::var_os("USERPROFILE").or_else(|| env::var_os("HOME")) {
        candidates
            .push(PathBuf::from(home).join("AppData/Local/Programs/ExifTool/ExifTool.exe"));
    }

    candidates
}

#[cfg(windows)]
fn tool_binary_name() -> &'static str {
    "exiftool.exe"
}

#[cfg(not(windows))]
fn tool_binary_name() -> &'static str {
    "exiftool"
}

struct ToolOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    /// Cola combinada de stdout/stderr para mensajes de error legibles.
    fn tail(&self) -> String {
        let combined = format!("{}\n{}", self.stdout, self.stderr);
        let trimmed = combined.trim();
        let mut start = trimmed.len().saturating_sub(400);
        while start < trimmed.len() && !trimmed.is_char_boundary(start) {
            start += 1;
        }
        trimmed[start..].to_string()
    }
}

/// Ejecuta el comando con tope de tiempo, drenando los pipes en hilos para
/// que la herramienta nunca se bloquee llenando el buffer.
fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<ToolOutput, String> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| format!("No se pudo ejecutar la herramienta externa: {}", e))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_handle = thread::spawn(move || read_pipe(stdout_pipe));
    let stderr_handle = thread::spawn(move || read_pipe(stderr_pipe));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(
                        "La herramienta externa excedió el tiempo de espera".to_string()
                    );
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(error) => {
                return Err(format!(
                    "No se pudo esperar a la herramienta externa: {}",
                    error
                ));
            }
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    Ok(ToolOutput {
        success: status.success(),
        stdout,
        stderr,
    })
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buffer = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buffer);
    }
    buffer
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}
