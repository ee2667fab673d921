use std::sync::Arc;

use mongodb::Database;

use crate::{config::Config, database::init_mongo, notify::Mailer, rating::UserLocks};

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub mailer: Mailer,
    pub rating_locks: UserLocks,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let db = init_mongo(&config.db_uri, &config.db_name).await;
        let mailer = Mailer::new(config.mail_url.clone());

        Arc::new(Self {
            config,
            db,
            mailer,
            rating_locks: UserLocks::default(),
        })
    }
}
