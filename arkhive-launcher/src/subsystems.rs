//! The three subsystems the engine controller boots: catalog
//! ingest/projection, identity, and artifact provisioning.

use arkhive_engine::controller::Subsystem;
use arkhive_net::build_client;
use arkhive_provision::{Layout, Provisioner};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, oneshot, Barrier};

/// Runs catalog ingest/projection, then hands the store connection off
/// to whoever needs read access next, and broadcasts that the catalog
/// is ready.
pub struct CatalogSubsystem {
    root: PathBuf,
    connection: Mutex<Option<Connection>>,
    handoff: Mutex<Option<oneshot::Sender<Connection>>>,
    decrypted: broadcast::Sender<()>,
}

impl CatalogSubsystem {
    pub fn new(root: PathBuf, connection: Connection) -> (Arc<CatalogSubsystem>, oneshot::Receiver<Connection>) {
        let (tx, rx) = oneshot::channel();
        let (decrypted, _) = broadcast::channel(4);
        let subsystem = Arc::new(CatalogSubsystem {
            root,
            connection: Mutex::new(Some(connection)),
            handoff: Mutex::new(Some(tx)),
            decrypted,
        });
        (subsystem, rx)
    }

    pub fn subscribe_decrypted(&self) -> broadcast::Receiver<()> {
        self.decrypted.subscribe()
    }
}

#[async_trait]
impl Subsystem for CatalogSubsystem {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn initialize(&self, barrier: Arc<Barrier>) {
        let mut conn = self.connection.lock().unwrap().take().expect("catalog connection already taken");

        match arkhive_catalog::run_ingest(&mut conn, &self.root) {
            Ok(true) => log::info!("catalog ingested a new revision"),
            Ok(false) => log::info!("catalog unchanged since last run"),
            Err(err) => log::error!("catalog ingest failed: {err}"),
        }

        let _ = self.decrypted.send(());

        if let Some(tx) = self.handoff.lock().unwrap().take() {
            let _ = tx.send(conn);
        }

        barrier.wait().await;
    }
}

/// Loads and verifies the user's identity against the publisher's
/// bootstrap public key, if one is on disk.
pub struct IdentitySubsystem {
    system_dir: PathBuf,
}

impl IdentitySubsystem {
    pub fn new(system_dir: PathBuf) -> Arc<IdentitySubsystem> {
        Arc::new(IdentitySubsystem { system_dir })
    }
}

#[async_trait]
impl Subsystem for IdentitySubsystem {
    fn name(&self) -> &str {
        "identity"
    }

    async fn initialize(&self, barrier: Arc<Barrier>) {
        match arkhive_identity::Identity::boot(&self.system_dir) {
            Ok(identity) => log::info!("identity status: {:?}", identity.status()),
            Err(err) => log::error!("identity boot failed: {err}"),
        }
        barrier.wait().await;
    }
}

/// Waits for the catalog to finish ingesting, takes over the store
/// connection, then provisions tools and cores.
pub struct ProvisionSubsystem {
    root: PathBuf,
    decrypted: Mutex<Option<broadcast::Receiver<()>>>,
    connection: Mutex<Option<oneshot::Receiver<Connection>>>,
}

impl ProvisionSubsystem {
    pub fn new(
        root: PathBuf,
        decrypted: broadcast::Receiver<()>,
        connection: oneshot::Receiver<Connection>,
    ) -> Arc<ProvisionSubsystem> {
        Arc::new(ProvisionSubsystem {
            root,
            decrypted: Mutex::new(Some(decrypted)),
            connection: Mutex::new(Some(connection)),
        })
    }
}

#[async_trait]
impl Subsystem for ProvisionSubsystem {
    fn name(&self) -> &str {
        "provision"
    }

    async fn initialize(&self, barrier: Arc<Barrier>) {
        let mut decrypted = self.decrypted.lock().unwrap().take().expect("decrypted receiver already taken");
        let _ = decrypted.recv().await;

        let connection_rx = self.connection.lock().unwrap().take().expect("connection receiver already taken");
        let Ok(conn) = connection_rx.await else {
            log::error!("provisioning never received the store connection");
            barrier.wait().await;
            return;
        };

        let layout = Layout::new(self.root.clone());
        if let Err(err) = layout.ensure_dirs() {
            log::error!("cannot create provisioning directories: {err}");
            barrier.wait().await;
            return;
        }

        let client = match build_client() {
            Ok(client) => client,
            Err(err) => {
                log::error!("cannot build HTTP client: {err}");
                barrier.wait().await;
                return;
            }
        };
        let provisioner = Provisioner::new(layout, client);

        if let Err(err) = provisioner.provision_tools(&conn).await {
            log::error!("tool provisioning failed: {err}");
        }
        if let Err(err) = provisioner.provision_cores(&conn).await {
            log::error!("core provisioning failed: {err}");
        }

        barrier.wait().await;
    }
}
