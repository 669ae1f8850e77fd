use crate::config::AppConfig;
use crate::museums::repo::MuseumDirectory;
use crate::scanner::services::{ArtifactIdentifier, OpenRouterIdentifier};
use crate::storage::{JsonFileStore, UserRepository};
use crate::users::services::UserService;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
    pub museums: Arc<MuseumDirectory>,
    pub scanner: Arc<dyn ArtifactIdentifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = JsonFileStore::new(&config.users_file);
        match store.load().await {
            Ok(users) => info!(path = %store.path().display(), count = users.len(), "user store ready"),
            // Requests report the fault themselves; keep serving the catalogue.
            Err(e) => warn!(error = %e, "user store unreadable at startup"),
        }
        let users = UserService::new(Arc::new(store) as Arc<dyn UserRepository>);

        let museums = Arc::new(MuseumDirectory::load(&config.museums_file).await?);

        if config.scanner.api_key.is_none() {
            warn!("OPENROUTER_API_KEY not set; artifact scanner disabled");
        }
        let scanner = Arc::new(OpenRouterIdentifier::new(config.scanner.clone())?)
            as Arc<dyn ArtifactIdentifier>;

        Ok(Self {
            config,
            users,
            museums,
            scanner,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::museums::repo::Museum;
        use crate::scanner::services::{ImagePayload, ScannerError};
        use crate::storage::MemoryStore;
        use async_trait::async_trait;

        #[derive(Clone)]
        struct FakeIdentifier;
        #[async_trait]
        impl ArtifactIdentifier for FakeIdentifier {
            async fn identify(&self, image: &ImagePayload) -> Result<String, ScannerError> {
                Ok(format!(
                    "```json\n{{\"name\":\"Didarganj Yakshi\",\"description\":\"{}\",\
                     \"period\":\"Mauryan\",\"significance\":\"Polished sandstone\",\"isArtifact\":true}}\n```",
                    image.mime_type
                ))
            }
        }

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            users_file: "fake/users.json".into(),
            museums_file: "fake/museums.json".into(),
            scanner: crate::config::ScannerConfig {
                api_key: None,
                model: "fake".into(),
                url: "http://fake.local".into(),
                site_url: "http://fake.local".into(),
                app_name: "fake".into(),
                max_tokens: 1,
            },
        });

        let museums = MuseumDirectory::new(vec![Museum {
            id: 3,
            name: "Indian Museum".into(),
            location: "Kolkata".into(),
            state: "West Bengal".into(),
            description: "Oldest museum in India".into(),
            image: String::new(),
            opening_hours: None,
            ticket_price: None,
            top_exhibits: vec![],
        }]);

        Self {
            config,
            users: UserService::new(Arc::new(MemoryStore::default())),
            museums: Arc::new(museums),
            scanner: Arc::new(FakeIdentifier),
        }
    }
}
