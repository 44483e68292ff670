use std::sync::Arc;

use crate::{
    auth::JwtAuthenticator, bootstrap::Services, config::Environment, database::Database,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub database: Database,
    pub authenticator: Arc<JwtAuthenticator>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(services: Services, environment: Environment) -> Self {
        let Services {
            authenticator,
            database,
        } = services;
        Self {
            database,
            authenticator,
            environment,
        }
    }
}
