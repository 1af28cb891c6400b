//! Client state
//!
//! Everything the front end needs, wired once at startup. Live services talk
//! to the backend; the built-in mock dataset stands in for each of them when
//! it is unreachable. All fields are `Arc` or cheap to clone.

use crate::api::{
    ApiClient, LiveAiChatService, LiveAuthService, LiveExerciseService, LiveNutritionService,
    LiveProgressService, LiveWorkoutService,
};
use crate::chat::{BackendChatTransport, ChatBridge, ChatTransport, DeepSeekTransport, N8nTransport};
use crate::config::{AppConfig, ChatProvider};
use crate::error::ClientResult;
use crate::mock::MockDataset;
use crate::probe::AvailabilityProbe;
use crate::services::{
    AiChatFacade, AuthFacade, ExerciseFacade, FallbackGuard, NutritionFacade, ProgressFacade,
    WorkoutFacade,
};
use crate::status::{BackendStatus, Notifier};
use crate::store::{FileStore, KeyValueStore, LocalCache};
use crate::sync::SyncEngine;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ClientState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<LocalCache>,
    pub status: Arc<BackendStatus>,
    pub notifier: Notifier,
    pub workouts: WorkoutFacade,
    pub nutrition: NutritionFacade,
    pub progress: ProgressFacade,
    pub exercises: ExerciseFacade,
    pub auth: AuthFacade,
    pub ai: AiChatFacade,
    pub sync: Arc<SyncEngine>,
    pub chat: Arc<ChatBridge>,
}

impl ClientState {
    /// Wire the client over `store`
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        let cache = Arc::new(LocalCache::new(store));
        let status = Arc::new(BackendStatus::new(cache.clone()));
        let notifier = Notifier::default();
        let guard = FallbackGuard::new(status.clone(), cache.clone(), notifier.clone());
        let mock = Arc::new(MockDataset::builtin());
        let api = ApiClient::new(&config.api, cache.clone())?;
        let user_id = config.user.id;

        let workouts = WorkoutFacade::new(
            Arc::new(LiveWorkoutService::new(api.clone())),
            mock.clone(),
            guard.clone(),
            user_id,
        );
        let nutrition = NutritionFacade::new(
            Arc::new(LiveNutritionService::new(api.clone())),
            mock.clone(),
            guard.clone(),
            user_id,
        );
        let progress = ProgressFacade::new(
            Arc::new(LiveProgressService::new(api.clone())),
            mock.clone(),
            guard.clone(),
            user_id,
        );
        let exercises = ExerciseFacade::new(
            Arc::new(LiveExerciseService::new(api.clone())),
            mock.clone(),
            guard.clone(),
        );
        let auth = AuthFacade::new(
            Arc::new(LiveAuthService::new(api.clone())),
            mock.clone(),
            guard.clone(),
        );
        let ai = AiChatFacade::new(Arc::new(LiveAiChatService::new(api)), mock, guard);

        // Replay goes straight to the live services, never to the mock
        let sync = Arc::new(SyncEngine::new(
            workouts.live().clone(),
            nutrition.live().clone(),
            progress.live().clone(),
            cache.clone(),
            notifier.clone(),
            config.sync.clear_policy,
        ));

        let transport: Arc<dyn ChatTransport> = match config.chat.provider {
            ChatProvider::Backend => Arc::new(BackendChatTransport::new(ai.clone())),
            ChatProvider::N8n => Arc::new(N8nTransport::new(&config.chat, cache.clone())?),
            ChatProvider::Deepseek => Arc::new(DeepSeekTransport::new(&config.chat)?),
        };
        info!(provider = transport.name(), "Chat provider selected");
        let chat = Arc::new(ChatBridge::new(
            transport,
            workouts.clone(),
            nutrition.clone(),
            progress.clone(),
            user_id,
        ));

        Ok(Self {
            config: Arc::new(config),
            cache,
            status,
            notifier,
            workouts,
            nutrition,
            progress,
            exercises,
            auth,
            ai,
            sync,
            chat,
        })
    }

    /// Wire the client over the configured storage directory
    pub fn from_config(config: AppConfig) -> ClientResult<Self> {
        let store = FileStore::open(&config.storage.dir)?;
        info!(dir = %store.dir().display(), "Local cache opened");
        Self::new(config, Arc::new(store))
    }

    /// A health probe sharing this state's status and notifications
    pub fn probe(&self) -> ClientResult<AvailabilityProbe> {
        AvailabilityProbe::new(
            &self.config,
            self.status.clone(),
            self.cache.clone(),
            self.notifier.clone(),
        )
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
