use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use crate::application::ports::files_repository::{
    EntityRef, FileFilter, FileListQuery, FilesRepository,
};
use crate::domain::files::file::{
    Client, FileWithRelations, Location, NewClient, NewFile, NewLocation, ServiceType, StoredFile,
};
use crate::infrastructure::db::PgPool;

const FILE_COLUMNS: &str = r#"f.id, f.nombre_original_archivo, f.nombre_archivo_almacenado, f.mime_type,
    f.tamano_bytes, f.ruta_almacenamiento_fisico, f.cliente_id, f.lugar_id, f.tipo_servicio_id,
    f.periodicidad, f.nombre_equipo, f.identificador_tarea, f.fecha_realizacion_servicio,
    f.hash_contenido, f.metadatos_adicionales, f.subido_por_usuario_id, f.fecha_subida, f.updated_at"#;

const RELATION_COLUMNS: &str = r#"c.nombre_cliente, c.detalles AS c_detalles,
    c.created_at AS c_created_at, c.updated_at AS c_updated_at,
    l.nombre_lugar, l.direccion AS l_direccion, l.detalles AS l_detalles,
    l.created_at AS l_created_at, l.updated_at AS l_updated_at,
    t.nombre_tipo_servicio, t.descripcion AS t_descripcion,
    t.created_at AS t_created_at, t.updated_at AS t_updated_at"#;

const FILE_JOINS: &str = r#" FROM files f
    JOIN clients c ON c.id = f.cliente_id
    JOIN locations l ON l.id = f.lugar_id
    JOIN service_types t ON t.id = f.tipo_servicio_id"#;

pub struct SqlxFilesRepository {
    pub pool: PgPool,
}

impl SqlxFilesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn client_from_row(r: &PgRow) -> Client {
    Client {
        id: r.get("id"),
        name: r.get("nombre_cliente"),
        details: r.get("detalles"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn location_from_row(r: &PgRow) -> Location {
    Location {
        id: r.get("id"),
        name: r.get("nombre_lugar"),
        address: r.get("direccion"),
        details: r.get("detalles"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn file_from_row(r: &PgRow) -> StoredFile {
    StoredFile {
        id: r.get("id"),
        original_filename: r.get("nombre_original_archivo"),
        stored_filename: r.get("nombre_archivo_almacenado"),
        mime_type: r.get("mime_type"),
        size_bytes: r.get("tamano_bytes"),
        storage_path: r.get("ruta_almacenamiento_fisico"),
        client_id: r.get("cliente_id"),
        location_id: r.get("lugar_id"),
        service_type_id: r.get("tipo_servicio_id"),
        periodicity: r.get("periodicidad"),
        equipment_name: r.get("nombre_equipo"),
        task_id: r.get("identificador_tarea"),
        service_date: r.get("fecha_realizacion_servicio"),
        content_hash: r.get("hash_contenido"),
        extra_metadata: r.get("metadatos_adicionales"),
        uploaded_by: r.get("subido_por_usuario_id"),
        uploaded_at: r.get("fecha_subida"),
        updated_at: r.get("updated_at"),
    }
}

fn file_with_relations_from_row(r: &PgRow) -> FileWithRelations {
    let file = file_from_row(r);
    FileWithRelations {
        client: Client {
            id: file.client_id,
            name: r.get("nombre_cliente"),
            details: r.get("c_detalles"),
            created_at: r.get("c_created_at"),
            updated_at: r.get("c_updated_at"),
        },
        location: Location {
            id: file.location_id,
            name: r.get("nombre_lugar"),
            address: r.get("l_direccion"),
            details: r.get("l_detalles"),
            created_at: r.get("l_created_at"),
            updated_at: r.get("l_updated_at"),
        },
        service_type: ServiceType {
            id: file.service_type_id,
            name: r.get("nombre_tipo_servicio"),
            description: r.get("t_descripcion"),
            created_at: r.get("t_created_at"),
            updated_at: r.get("t_updated_at"),
        },
        file,
    }
}

fn push_entity_filter(
    qb: &mut QueryBuilder<'_, Postgres>,
    entity: &Option<EntityRef>,
    id_column: &str,
    name_column: &str,
) {
    match entity {
        Some(EntityRef::Id(id)) => {
            qb.push(format!(" AND {} = ", id_column)).push_bind(*id);
        }
        Some(EntityRef::Name(name)) => {
            qb.push(format!(" AND {} = ", name_column))
                .push_bind(name.clone());
        }
        None => {}
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, filter: &FileFilter) {
    qb.push(" WHERE TRUE");
    push_entity_filter(qb, &filter.client, "f.cliente_id", "c.nombre_cliente");
    push_entity_filter(qb, &filter.location, "f.lugar_id", "l.nombre_lugar");
    push_entity_filter(
        qb,
        &filter.service_type,
        "f.tipo_servicio_id",
        "t.nombre_tipo_servicio",
    );
    if let Some((from, to)) = filter.service_date {
        qb.push(" AND f.fecha_realizacion_servicio >= ")
            .push_bind(from)
            .push(" AND f.fecha_realizacion_servicio < ")
            .push_bind(to);
    }
}

#[async_trait]
impl FilesRepository for SqlxFilesRepository {
    async fn find_client_by_name(&self, name: &str) -> anyhow::Result<Option<Client>> {
        let row = sqlx::query(
            r#"SELECT id, nombre_cliente, detalles, created_at, updated_at
               FROM clients WHERE nombre_cliente = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(client_from_row))
    }

    async fn insert_client(&self, client: &NewClient) -> anyhow::Result<Option<Client>> {
        let row = sqlx::query(
            r#"INSERT INTO clients (nombre_cliente, detalles)
               VALUES ($1, $2)
               ON CONFLICT (nombre_cliente) DO NOTHING
               RETURNING id, nombre_cliente, detalles, created_at, updated_at"#,
        )
        .bind(&client.name)
        .bind(client.details.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(client_from_row))
    }

    async fn find_location_by_name(&self, name: &str) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query(
            r#"SELECT id, nombre_lugar, direccion, detalles, created_at, updated_at
               FROM locations WHERE nombre_lugar = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(location_from_row))
    }

    async fn insert_location(&self, location: &NewLocation) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query(
            r#"INSERT INTO locations (nombre_lugar, direccion, detalles)
               VALUES ($1, $2, $3)
               ON CONFLICT (nombre_lugar) DO NOTHING
               RETURNING id, nombre_lugar, direccion, detalles, created_at, updated_at"#,
        )
        .bind(&location.name)
        .bind(location.address.as_deref())
        .bind(location.details.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(location_from_row))
    }

    async fn find_service_type_by_name(&self, name: &str) -> anyhow::Result<Option<ServiceType>> {
        let row = sqlx::query(
            r#"SELECT id, nombre_tipo_servicio, descripcion, created_at, updated_at
               FROM service_types WHERE nombre_tipo_servicio = $1"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| ServiceType {
            id: r.get("id"),
            name: r.get("nombre_tipo_servicio"),
            description: r.get("descripcion"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    async fn insert_file(&self, file: &NewFile) -> anyhow::Result<StoredFile> {
        let row = sqlx::query(
            r#"INSERT INTO files AS f (
                   nombre_original_archivo, nombre_archivo_almacenado, mime_type, tamano_bytes,
                   ruta_almacenamiento_fisico, cliente_id, lugar_id, tipo_servicio_id,
                   periodicidad, nombre_equipo, identificador_tarea, fecha_realizacion_servicio,
                   metadatos_adicionales, subido_por_usuario_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               RETURNING f.*"#,
        )
        .bind(&file.original_filename)
        .bind(&file.stored_filename)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.storage_path)
        .bind(file.client_id)
        .bind(file.location_id)
        .bind(file.service_type_id)
        .bind(file.periodicity.as_deref())
        .bind(file.equipment_name.as_deref())
        .bind(file.task_id.as_deref())
        .bind(file.service_date)
        .bind(file.extra_metadata.as_ref())
        .bind(file.uploaded_by.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(file_from_row(&row))
    }

    async fn get_file(&self, file_id: i32) -> anyhow::Result<Option<StoredFile>> {
        let sql = format!("SELECT {} FROM files f WHERE f.id = $1", FILE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(file_from_row))
    }

    async fn delete_file(&self, file_id: i32) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_files(&self, query: &FileListQuery) -> anyhow::Result<Vec<FileWithRelations>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}, {}{}",
            FILE_COLUMNS, RELATION_COLUMNS, FILE_JOINS
        ));
        push_where(&mut qb, &query.filter);
        // Column and direction come from closed enums, never from raw input.
        qb.push(format!(
            " ORDER BY f.{} {}, f.id {}",
            query.sort_by.column(),
            query.sort_order.as_sql(),
            query.sort_order.as_sql()
        ));
        qb.push(" OFFSET ").push_bind(query.skip);
        qb.push(" LIMIT ").push_bind(query.take);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(file_with_relations_from_row).collect())
    }

    async fn count_files(&self, filter: &FileFilter) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(1){}", FILE_JOINS));
        push_where(&mut qb, filter);
        let n = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
