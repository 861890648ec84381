use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use mermaid_dash::app::{Effects, Services};
use mermaid_dash::editor::{Command, EditorModel, EditorSettings, Message, Route, update};
use mermaid_dash::notify::{Level, Notification, Notifier};
use mermaid_dash::render::{MermaidRenderer, RenderState};
use mermaid_dash::store::{
    DiagramId, DiagramPatch, DiagramRecord, NewDiagram, Profile, RecordStore, StoreError,
};
use mermaid_dash::sync::SaveStatus;

/// One-row store that counts calls and can be told to fail saves.
struct FakeStore {
    row: Mutex<Option<DiagramRecord>>,
    fetches: AtomicUsize,
    saves: Mutex<Vec<String>>,
    fail_saves: AtomicBool,
}

impl FakeStore {
    fn with_row(code: &str) -> Self {
        let at = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            row: Mutex::new(Some(DiagramRecord {
                id: DiagramId::from("X1"),
                title: "Signup funnel".to_string(),
                description: None,
                code: code.to_string(),
                thumbnail_url: None,
                created_by: "u1".to_string(),
                created_at: at,
                updated_at: at,
            })),
            fetches: AtomicUsize::new(0),
            saves: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
        }
    }

    fn empty() -> Self {
        let store = Self::with_row("");
        *store.row.lock().unwrap() = None;
        store
    }

    fn saves(&self) -> Vec<String> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn fetch(&self, id: &DiagramId) -> Result<Option<DiagramRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.row.lock().unwrap().clone().filter(|r| &r.id == id))
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<DiagramRecord>, StoreError> {
        Ok(self
            .row
            .lock()
            .unwrap()
            .clone()
            .filter(|r| r.created_by == owner)
            .into_iter()
            .collect())
    }

    async fn insert(&self, _new: NewDiagram) -> Result<DiagramRecord, StoreError> {
        Err(StoreError::Unavailable("read-only fake".to_string()))
    }

    async fn update(
        &self,
        id: &DiagramId,
        patch: DiagramPatch,
    ) -> Result<DiagramRecord, StoreError> {
        let code = patch.code.unwrap_or_default();
        self.saves.lock().unwrap().push(code.clone());
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        let mut row = self.row.lock().unwrap();
        let record = row
            .as_mut()
            .filter(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        record.code = code;
        record.updated_at += TimeDelta::seconds(1);
        Ok(record.clone())
    }

    async fn delete(&self, id: &DiagramId) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id.clone()))
    }

    async fn fetch_profile(&self, _user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(None)
    }

    async fn upsert_profile(&self, _profile: Profile) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Notification>>);

impl Notifier for Recorder {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

struct Harness {
    store: Arc<FakeStore>,
    notes: Arc<Recorder>,
    effects: Effects,
    model: EditorModel,
    routes: Vec<Route>,
    renders: usize,
}

impl Harness {
    async fn open(store: FakeStore) -> Self {
        let store = Arc::new(store);
        let notes = Arc::new(Recorder::default());
        let export_dir = std::env::temp_dir().join("mermaid-dash-scenarios");
        let effects = Effects::new(
            Services {
                store: Arc::clone(&store) as Arc<dyn RecordStore>,
                renderer: Arc::new(MermaidRenderer::default()),
                notifier: Arc::clone(&notes) as Arc<dyn Notifier>,
            },
            export_dir,
        );
        let mut harness = Self {
            store,
            notes,
            effects,
            model: EditorModel::open(DiagramId::from("X1"), EditorSettings::default()),
            routes: Vec::new(),
            renders: 0,
        };
        harness.run_commands().await;
        harness
    }

    /// Execute queued commands, feeding completions back, until quiet.
    async fn run_commands(&mut self) {
        loop {
            let commands = self.model.take_commands();
            if commands.is_empty() {
                return;
            }
            for command in commands {
                match &command {
                    Command::Navigate(route) => self.routes.push(*route),
                    Command::Render(_) => self.renders += 1,
                    _ => {}
                }
                if let Some(message) = self.effects.execute(command).await {
                    self.model = update(std::mem::take(&mut self.model), message);
                }
            }
        }
    }

    async fn send(&mut self, message: Message) {
        self.model = update(std::mem::take(&mut self.model), message);
        self.run_commands().await;
    }

    async fn tick(&mut self, now_ms: u64) {
        self.send(Message::Tick(now_ms)).await;
    }

    async fn edit(&mut self, text: &str, now_ms: u64) {
        self.send(Message::TextChanged(text.to_string(), now_ms)).await;
    }
}

#[tokio::test]
async fn scenario_a_loaded_document_renders() {
    let mut h = Harness::open(FakeStore::with_row("graph TD\nA-->B")).await;
    h.tick(200).await;

    let RenderState::Success(artifact) = h.model.render_state() else {
        panic!("expected a rendered artifact, got {:?}", h.model.render_state());
    };
    assert_eq!(artifact.kind, "graph");
    assert!(artifact.svg.contains(&format!(r#"id="{}""#, artifact.render_id)));
    assert!(artifact.width > 0.0);
    assert!(h.store.saves().is_empty(), "loading never saves");
}

#[tokio::test]
async fn scenario_b_malformed_text_fails_render_only() {
    let mut h = Harness::open(FakeStore::with_row("graph TD\nA-->B")).await;
    h.tick(200).await;

    h.edit("grph TD\nA-->B", 1_000).await;
    h.tick(1_199).await;
    assert!(matches!(h.model.render_state(), RenderState::Success(_)));
    h.tick(1_200).await;

    let RenderState::Failure(diagnostic) = h.model.render_state() else {
        panic!("expected a diagnostic");
    };
    assert!(diagnostic.starts_with("line 1:"), "{diagnostic}");
    assert_eq!(h.model.save_status(), SaveStatus::Idle);

    // The malformed text is still persisted once the quiet period ends.
    h.tick(2_500).await;
    assert_eq!(h.store.saves(), vec!["grph TD\nA-->B".to_string()]);
}

#[tokio::test]
async fn scenario_c_idle_edit_saves_once() {
    let mut h = Harness::open(FakeStore::with_row("graph TD\nA-->B")).await;
    h.edit("graph TD\nA-->C", 100).await;
    h.tick(1_599).await;
    assert!(h.store.saves().is_empty());

    h.tick(1_600).await;
    assert_eq!(h.store.saves(), vec!["graph TD\nA-->C".to_string()]);
    let doc = h.model.document().unwrap();
    assert_eq!(doc.last_persisted_text(), "graph TD\nA-->C");
    assert!(!doc.is_diverged());
    assert_eq!(h.model.save_status(), SaveStatus::Idle);

    h.tick(5_000).await;
    assert_eq!(h.store.saves().len(), 1, "no further saves when idle");
}

#[tokio::test]
async fn scenario_d_rapid_edits_collapse_to_one_save() {
    let mut h = Harness::open(FakeStore::with_row("graph TD\nA-->B")).await;
    let mut last = String::new();
    for step in 0..=10u64 {
        let now = step * 500;
        last = format!("graph TD\nA-->N{step}");
        h.edit(&last, now).await;
        h.tick(now + 250).await;
    }
    // Typing stopped at 5000.
    h.tick(6_499).await;
    assert!(h.store.saves().is_empty());
    h.tick(6_500).await;
    assert_eq!(h.store.saves(), vec![last.clone()]);
    assert_eq!(h.model.document().unwrap().last_persisted_text(), last);
}

#[tokio::test]
async fn scenario_e_missing_document_navigates_away() {
    let mut h = Harness::open(FakeStore::empty()).await;
    h.tick(10_000).await;

    assert_eq!(h.routes, vec![Route::Listing]);
    let notes = h.notes.0.lock().unwrap();
    assert!(
        notes
            .iter()
            .any(|n| n.level == Level::Error && n.title == "Diagram not found")
    );
    assert!(h.store.saves().is_empty());
    assert_eq!(h.renders, 0);
    assert_eq!(h.store.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_save_keeps_watermark_and_retries_only_on_next_edit() {
    let mut h = Harness::open(FakeStore::with_row("graph TD\nA-->B")).await;
    h.store.fail_saves.store(true, Ordering::SeqCst);
    h.edit("graph TD\nA-->C", 0).await;
    h.tick(1_500).await;

    assert!(matches!(h.model.save_status(), SaveStatus::Error(reason) if reason.contains("connection reset")));
    assert_eq!(h.model.document().unwrap().last_persisted_text(), "graph TD\nA-->B");
    assert!(h.model.document().unwrap().is_diverged());
    assert!(h.notes.0.lock().unwrap().iter().any(|n| n.level == Level::Error
        && n.title == "Sync Failed"
        && n.detail.as_deref().is_some_and(|d| d.contains("connection reset"))));

    // Nothing retries on its own.
    h.tick(20_000).await;
    assert_eq!(h.store.saves().len(), 1);

    h.store.fail_saves.store(false, Ordering::SeqCst);
    h.edit("graph TD\nA-->D", 21_000).await;
    h.tick(22_500).await;
    assert_eq!(h.store.saves().len(), 2);
    assert_eq!(h.model.save_status(), SaveStatus::Idle);
    assert_eq!(h.model.document().unwrap().last_persisted_text(), "graph TD\nA-->D");
}

#[tokio::test]
async fn reverting_to_saved_text_does_not_save() {
    let mut h = Harness::open(FakeStore::with_row("graph TD\nA-->B")).await;
    h.edit("graph TD\nA-->C", 0).await;
    h.edit("graph TD\nA-->B", 400).await;
    h.tick(3_000).await;
    assert!(h.store.saves().is_empty());
}

#[tokio::test]
async fn reverting_after_failed_save_shows_saved() {
    let mut h = Harness::open(FakeStore::with_row("v1")).await;
    h.store.fail_saves.store(true, Ordering::SeqCst);
    h.edit("v2", 0).await;
    h.tick(1_500).await;
    assert!(matches!(h.model.save_status(), SaveStatus::Error(_)));

    h.edit("v1", 2_000).await;
    h.tick(10_000).await;
    assert_eq!(h.model.save_status(), SaveStatus::Idle);
    assert_eq!(h.store.saves(), vec!["v2".to_string()]);
    assert!(!h.model.document().unwrap().is_diverged());
}
