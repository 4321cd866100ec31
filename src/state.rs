use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::{DbPool, client_store::ClientStore, shipment_store::ShipmentStore, user_store::UserStore},
    services::{
        AuthService, ClientService, ShipmentService,
        storage::{DocumentStorage, SimulatedStorage},
    },
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: DbPool,
    pub users: UserStore,
    pub auth: AuthService,
    pub clients: ClientService,
    pub shipments: ShipmentService,
}

impl AppState {
    pub fn new(config: Config, pool: DbPool) -> Self {
        let storage: Arc<dyn DocumentStorage> = Arc::new(SimulatedStorage::new(
            Duration::from_millis(config.upload_delay_ms),
        ));
        let users = UserStore::new(pool.clone());
        let client_store = ClientStore::new(pool.clone());
        let shipment_store = ShipmentStore::new(pool.clone());

        Self {
            auth: AuthService::new(
                users.clone(),
                config.jwt_secret.clone(),
                config.session_hours,
            ),
            clients: ClientService::new(client_store),
            shipments: ShipmentService::new(shipment_store, users.clone(), storage),
            users,
            config: Arc::new(config),
            pool,
        }
    }
}
