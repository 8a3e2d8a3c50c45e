use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::files::file::ServiceKind;

pub const CLIENT_NAME_FIELD: &str = "clienteNombre";
pub const LOCATION_NAME_FIELD: &str = "lugarNombre";
pub const SERVICE_TYPE_NAME_FIELD: &str = "tipoServicioNombre";

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`, one for one.
/// Absent input yields an empty string.
pub fn sanitize_path_part(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Faltan metadatos requeridos: {}.", .missing.join(", "))]
pub struct MissingMetadataError {
    /// Wire names of the absent fields, always in client, location, service-type order.
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathMetadata<'a> {
    pub client_name: Option<&'a str>,
    pub location_name: Option<&'a str>,
    pub service_type_name: Option<&'a str>,
    pub periodicity: Option<&'a str>,
    pub equipment_name: Option<&'a str>,
    pub task_id: Option<&'a str>,
}

/// Sanitizes one directory level. Names made only of dots would be read as
/// `.` or `..` by the filesystem, so each dot becomes `_` there.
pub fn path_segment(name: Option<&str>) -> String {
    let part = sanitize_path_part(name);
    if !part.is_empty() && part.chars().all(|c| c == '.') {
        "_".repeat(part.len())
    } else {
        part
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl PathMetadata<'_> {
    pub fn check_required(&self) -> Result<(), MissingMetadataError> {
        let missing: Vec<&'static str> = [
            (self.client_name, CLIENT_NAME_FIELD),
            (self.location_name, LOCATION_NAME_FIELD),
            (self.service_type_name, SERVICE_TYPE_NAME_FIELD),
        ]
        .into_iter()
        .filter(|(value, _)| present(*value).is_none())
        .map(|(_, field)| field)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingMetadataError { missing })
        }
    }
}

/// Directory (without filename) where a file with this metadata lives:
/// `{base}/{client}/{location}/{serviceType}[/{sub1}[/{sub2}]]`.
pub fn build_storage_dir(
    base: &Path,
    meta: &PathMetadata<'_>,
) -> Result<PathBuf, MissingMetadataError> {
    meta.check_required()?;
    let service_type = meta.service_type_name.unwrap_or_default();

    let mut dir = base.to_path_buf();
    dir.push(path_segment(meta.client_name));
    dir.push(path_segment(meta.location_name));
    dir.push(path_segment(Some(service_type)));

    let periodicity = present(meta.periodicity);
    let equipment = present(meta.equipment_name);
    let task = present(meta.task_id);

    let sub_levels: Vec<&str> = match ServiceKind::from_name(service_type) {
        ServiceKind::Maintenance => match (periodicity, equipment) {
            (Some(p), Some(e)) => vec![p, e],
            _ => Vec::new(),
        },
        ServiceKind::Survey => match (equipment, task) {
            (Some(e), Some(t)) => vec![e, t],
            _ => Vec::new(),
        },
        ServiceKind::Works => task.into_iter().collect(),
        ServiceKind::Other => Vec::new(),
    };
    for part in sub_levels {
        dir.push(path_segment(Some(part)));
    }
    Ok(dir)
}

/// Splits a filename into base and extension, keeping the leading dot on the
/// extension. Dotfiles such as `.env` have no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// `{sanitized-base}_{uuid}{extension}`; unique per call so identical
/// original names never collide inside one directory.
pub fn generate_stored_filename(original: &str) -> String {
    generate_stored_filename_with(original, Uuid::new_v4())
}

pub fn generate_stored_filename_with(original: &str, token: Uuid) -> String {
    let file_name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);
    let (base, ext) = split_extension(file_name);
    let mut base = sanitize_path_part(Some(base));
    if base.is_empty() {
        base = "file".into();
    }
    format!("{}_{}{}", base, token, sanitize_path_part(Some(ext)))
}
