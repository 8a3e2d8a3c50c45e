use chrono::{Duration, NaiveTime};

use crate::application::ports::files_repository::{
    EntityRef, FileFilter, FileListQuery, FilesRepository, SortField, SortOrder,
};
use crate::application::use_cases::files::FileServiceError;
use crate::application::validation::{Violations, parse_iso8601};
use crate::domain::files::file::FileWithRelations;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw list parameters as received; validated by [`ListFiles::build_query`].
#[derive(Debug, Clone, Default)]
pub struct ListFilesRequest {
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub location_id: Option<String>,
    pub location_name: Option<String>,
    pub service_type_id: Option<String>,
    pub service_type_name: Option<String>,
    pub service_date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub items_per_page: i64,
}

pub struct FilePage {
    pub items: Vec<FileWithRelations>,
    pub pagination: Pagination,
}

pub struct ListFiles<'a, R: FilesRepository + ?Sized> {
    pub repo: &'a R,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Id wins over name when both are supplied for the same entity.
fn entity_ref(id: Option<i32>, name: Option<&str>) -> Option<EntityRef> {
    match (id, name) {
        (Some(id), _) => Some(EntityRef::Id(id)),
        (None, Some(name)) => Some(EntityRef::Name(name.to_string())),
        (None, None) => None,
    }
}

impl<'a, R: FilesRepository + ?Sized> ListFiles<'a, R> {
    pub fn build_query(req: &ListFilesRequest) -> Result<(FileListQuery, i64), FileServiceError> {
        let mut v = Violations::default();
        let client_id = v.positive_id("cliente_id", non_empty(&req.client_id));
        let location_id = v.positive_id("lugar_id", non_empty(&req.location_id));
        let service_type_id = v.positive_id("tipo_servicio_id", non_empty(&req.service_type_id));
        let page = v
            .int_in_range(
                "page",
                non_empty(&req.page),
                1,
                i64::from(i32::MAX),
                "El parámetro \"page\" debe ser un entero positivo.",
            )
            .unwrap_or(DEFAULT_PAGE);
        let limit = v
            .int_in_range(
                "limit",
                non_empty(&req.limit),
                1,
                MAX_LIMIT,
                "El parámetro \"limit\" debe ser un entero positivo, máximo 100.",
            )
            .unwrap_or(DEFAULT_LIMIT);

        let service_date = match non_empty(&req.service_date) {
            Some(raw) => match parse_iso8601(raw) {
                Some(instant) => {
                    let day = instant.date_naive().and_time(NaiveTime::MIN);
                    let from = day.and_utc();
                    Some((from, from + Duration::days(1)))
                }
                None => {
                    v.push(
                        "fechaRealizacionServicio",
                        "Formato de fechaRealizacionServicio inválido. Usar YYYY-MM-DD.",
                    );
                    None
                }
            },
            None => None,
        };
        v.into_result()?;

        let sort_by = non_empty(&req.sort_by)
            .and_then(SortField::parse)
            .unwrap_or_default();
        let sort_order = non_empty(&req.sort_order)
            .and_then(SortOrder::parse)
            .unwrap_or_default();

        let filter = FileFilter {
            client: entity_ref(client_id, non_empty(&req.client_name)),
            location: entity_ref(location_id, non_empty(&req.location_name)),
            service_type: entity_ref(service_type_id, non_empty(&req.service_type_name)),
            service_date,
        };
        let query = FileListQuery {
            filter,
            sort_by,
            sort_order,
            skip: (page - 1) * limit,
            take: limit,
        };
        Ok((query, page))
    }

    pub async fn execute(&self, req: &ListFilesRequest) -> Result<FilePage, FileServiceError> {
        let (query, page) = Self::build_query(req)?;
        let items = self.repo.list_files(&query).await?;
        let total_items = self.repo.count_files(&query.filter).await?;
        let total_pages = (total_items + query.take - 1) / query.take;
        tracing::debug!(
            total_items,
            page,
            returned = items.len(),
            "files_listed"
        );
        Ok(FilePage {
            items,
            pagination: Pagination {
                total_items,
                total_pages,
                current_page: page,
                items_per_page: query.take,
            },
        })
    }
}
