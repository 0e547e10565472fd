use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, QueryBuilder};
use tracing::{debug, info};

use opswatch_core::config::OpservConfig;
use opswatch_core::error::{OpswatchError, Result};
use opswatch_core::source::{OperationFilter, OperationSource};
use opswatch_core::types::Operation;

/// Row shape returned by the operations query. `date_start`/`date_end` are
/// epoch seconds in the XenForo schema; `is_opsec`/`is_completed` are
/// tinyint flags.
#[derive(sqlx::FromRow)]
struct OperationRow {
    operation_id: i64,
    operation_name: String,
    game_id: i64,
    game_name: String,
    leader_name: String,
    is_opsec: bool,
    is_completed: bool,
    date_start: i64,
    date_end: i64,
}

impl From<OperationRow> for Operation {
    fn from(row: OperationRow) -> Self {
        Operation {
            operation_id: row.operation_id,
            operation_name: row.operation_name,
            game_id: row.game_id,
            game_name: row.game_name,
            leader_name: row.leader_name,
            is_opsec: row.is_opsec,
            is_completed: row.is_completed,
            date_start: row.date_start,
            date_end: row.date_end,
        }
    }
}

/// Connection pool over the Opserv tables (`opserv_operations`,
/// `opserv_games`, `xf_user`).
#[derive(Clone)]
pub struct OpservDb {
    pool: MySqlPool,
}

impl OpservDb {
    pub async fn connect(config: &OpservConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| OpswatchError::Database(e.to_string()))?;

        info!(host = %config.host, database = %config.database, "connected to Opserv database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl OperationSource for OpservDb {
    async fn select_operations(&self, filter: OperationFilter) -> Result<Vec<Operation>> {
        let mut query: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT o.operation_id, o.operation_name, o.game_id, \
                    g.game_name, u.username AS leader_name, \
                    o.is_opsec, o.is_completed, o.date_start, o.date_end \
             FROM opserv_operations o \
             JOIN opserv_games g ON g.game_id = o.game_id \
             JOIN xf_user u ON u.user_id = o.leader_user_id \
             WHERE o.is_completed = 0",
        );

        if let Some(game_id) = filter.game_id {
            query.push(" AND o.game_id = ").push_bind(game_id);
        }
        if let Some(visibility) = filter.visibility {
            query.push(" AND o.is_opsec = ").push_bind(visibility.is_opsec());
        }
        // Bounds compare the minute-truncated start, matching the engine's
        // minute-granularity windows.
        if let Some(after) = filter.starts_at_or_after {
            query
                .push(" AND (o.date_start - (o.date_start % 60)) >= ")
                .push_bind(after);
        }
        if let Some(before) = filter.starts_at_or_before {
            query
                .push(" AND (o.date_start - (o.date_start % 60)) <= ")
                .push_bind(before);
        }
        query.push(" ORDER BY o.date_start");

        let rows: Vec<OperationRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| OpswatchError::Source(e.to_string()))?;

        debug!(count = rows.len(), ?filter, "opserv: operations selected");
        Ok(rows.into_iter().map(Operation::from).collect())
    }
}
