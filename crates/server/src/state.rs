use pillars_core::Config;
use pillars_rules::RuleEngine;
use pillars_store::PgSource;
use sqlx::PgPool;

pub struct AppState {
    pub config: Config,
    pub pg_pool: PgPool,
    pub engine: RuleEngine<PgSource>,
}

impl AppState {
    pub fn new(config: Config, pg_pool: PgPool) -> Self {
        let engine = RuleEngine::new(PgSource::new(pg_pool.clone()));
        Self {
            config,
            pg_pool,
            engine,
        }
    }
}
