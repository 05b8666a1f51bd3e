use std::io::Cursor;

use async_trait::async_trait;

use super::*;
use crate::foundation::core::Canvas;
use crate::project::store::InMemoryProjectStore;
use crate::scene::model::Project;

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn small_cfg() -> EditorConfig {
    EditorConfig {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        max_snapshots: 3,
        ..Default::default()
    }
}

fn session() -> (EditorSession, Arc<InMemoryProjectStore>) {
    let store = Arc::new(InMemoryProjectStore::new());
    let s = EditorSession::new(small_cfg(), store.clone()).unwrap();
    (s, store)
}

struct FlakyStore {
    fail: std::sync::atomic::AtomicBool,
    inner: InMemoryProjectStore,
}

#[async_trait]
impl ProjectStore for FlakyStore {
    async fn clear_and_replace_all(&self, projects: &[Project]) -> anyhow::Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("quota exceeded");
        }
        self.inner.clear_and_replace_all(projects).await
    }

    async fn get_all(&self) -> anyhow::Result<Vec<Project>> {
        self.inner.get_all().await
    }
}

#[test]
fn import_add_tweak_remove_scenario() {
    let (mut s, _) = session();
    assert!(s.current().is_none());

    assert_eq!(s.import_base(&png([255, 0, 0, 255])).unwrap(), 0);
    assert_eq!(s.history().len(), 1);
    let v1 = s.current().unwrap().clone();
    assert!(v1.layers.is_empty());

    let layer = s.add_layer(&png([0, 255, 0, 255]), "logo").unwrap().unwrap();
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history().current_index(), Some(1));
    let v2 = s.current().unwrap().clone();
    assert_eq!(v2.layers.len(), 1);
    assert_eq!(v2.layers[0].id, layer);
    assert_eq!(v2.url, v1.url);

    assert!(s.update_layout(LayoutTarget::Layer(layer), LayoutField::Scale, 0.5));
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.current().unwrap().layers[0].layout.scale(), 0.5);

    assert_eq!(s.remove_layer(layer).unwrap(), Some(2));
    assert_eq!(s.history().len(), 3);
    assert!(s.current().unwrap().layers.is_empty());
}

#[test]
fn garbage_imports_are_rejected_without_history_change() {
    let (mut s, _) = session();
    assert!(matches!(
        s.import_base(b"not an image"),
        Err(ForgeError::Decode(_))
    ));
    assert!(s.history().is_empty());
}

#[test]
fn add_layer_without_base_is_noop() {
    let (mut s, _) = session();
    assert_eq!(s.add_layer(&png([0, 0, 0, 255]), "x").unwrap(), None);
    assert!(s.history().is_empty());
}

#[test]
fn add_layer_names_blank_layers_and_selects_them() {
    let (mut s, _) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    let id = s.add_layer(&png([2, 2, 2, 255]), "  ").unwrap().unwrap();
    assert_eq!(s.current().unwrap().layers[0].name, "Layer 1");
    assert_eq!(s.selection(), LayoutTarget::Layer(id));

    assert!(s.update_selected_layout(LayoutField::TranslateX, 500.0));
    assert_eq!(s.current().unwrap().layers[0].layout.translate_x(), 100.0);
}

#[test]
fn select_target_only_accepts_existing_layouts() {
    let (mut s, _) = session();
    assert!(!s.select_target(LayoutTarget::Base));

    s.import_base(&png([1, 1, 1, 255])).unwrap();
    let id = s.add_layer(&png([2, 2, 2, 255]), "a").unwrap().unwrap();
    assert!(s.select_target(LayoutTarget::Base));
    assert_eq!(s.selection(), LayoutTarget::Base);

    assert!(!s.select_target(LayoutTarget::Layer(LayerId::new())));
    assert_eq!(s.selection(), LayoutTarget::Base);

    assert!(s.select_target(LayoutTarget::Layer(id)));
    assert!(s.update_selected_layout(LayoutField::StretchY, 1.5));
    assert_eq!(s.current().unwrap().layers[0].layout.stretch_y(), 1.5);
    assert!(s.current().unwrap().base_layout.is_default());
}

#[test]
fn layout_updates_are_clamped_to_control_ranges() {
    let (mut s, _) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    s.update_layout(LayoutTarget::Base, LayoutField::Scale, 9.0);
    s.update_layout(LayoutTarget::Base, LayoutField::StretchX, 0.0);
    let l = s.current().unwrap().base_layout;
    assert_eq!(l.scale(), 3.0);
    assert_eq!(l.stretch_x(), 1.0);
}

#[test]
fn browsing_back_then_editing_branches() {
    let (mut s, _) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    let l1 = s.add_layer(&png([2, 2, 2, 255]), "a").unwrap().unwrap();
    s.add_layer(&png([3, 3, 3, 255]), "b").unwrap();

    assert!(s.select_version(1));
    assert!(!s.select_version(7));
    assert_eq!(s.history().current_index(), Some(1));

    s.remove_layer(l1).unwrap();
    assert_eq!(s.history().len(), 3);
    assert!(s.current().unwrap().layers.is_empty());
    assert_eq!(s.selection(), LayoutTarget::Base);
}

#[test]
fn busy_session_rejects_content_edits() {
    let (mut s, _) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    let flag = s.busy_flag();
    let guard = flag.try_acquire().unwrap();

    assert!(matches!(
        s.import_base(&png([2, 2, 2, 255])),
        Err(ForgeError::Busy)
    ));
    assert!(matches!(
        s.add_layer(&png([2, 2, 2, 255]), "x"),
        Err(ForgeError::Busy)
    ));
    assert!(matches!(s.export(), Err(ForgeError::Busy)));
    assert!(!s.update_layout(LayoutTarget::Base, LayoutField::Scale, 2.0));
    assert!(!s.select_version(0));
    assert_eq!(s.history().len(), 1);

    drop(guard);
    assert!(s.export().unwrap().is_some());
}

#[test]
fn export_is_png_of_canvas_size() {
    let (mut s, _) = session();
    assert!(s.export().unwrap().is_none());
    s.import_base(&png([9, 9, 9, 255])).unwrap();

    let out = s.export().unwrap().unwrap();
    assert!(out.file_name.starts_with("thumbnail-"));
    assert!(out.file_name.ends_with(".png"));
    let img = image::load_from_memory(&out.png).unwrap();
    assert_eq!((img.width(), img.height()), (64, 36));
    assert!(!s.is_busy());
}

#[tokio::test]
async fn save_creates_then_updates_project() {
    let (mut s, store) = session();
    assert_eq!(s.save_project().await.unwrap(), None);

    s.import_base(&png([1, 1, 1, 255])).unwrap();
    let id = s.save_project().await.unwrap().unwrap();
    assert_eq!(s.library().active_id(), Some(id));
    assert_eq!(store.len(), 1);

    s.add_layer(&png([2, 2, 2, 255]), "x").unwrap();
    assert_eq!(s.save_project().await.unwrap(), Some(id));
    let stored = store.get_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].revision_stack, s.history().versions());
}

#[tokio::test]
async fn snapshots_need_an_active_project_and_are_capped() {
    let (mut s, store) = session();
    assert!(!s.create_snapshot().await.unwrap());
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    assert!(!s.create_snapshot().await.unwrap());

    s.save_project().await.unwrap();
    for _ in 0..5 {
        assert!(s.create_snapshot().await.unwrap());
    }
    assert_eq!(s.library().active().unwrap().snapshots.len(), 3);
    assert_eq!(s.history().len(), 1);
    assert_eq!(store.get_all().await.unwrap()[0].snapshots.len(), 3);
}

#[tokio::test]
async fn snapshot_outlives_pruned_branch_and_can_be_restored() {
    let (mut s, _) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    s.add_layer(&png([2, 2, 2, 255]), "x").unwrap();
    s.save_project().await.unwrap();
    s.create_snapshot().await.unwrap();
    let pinned = s.current().unwrap().id;

    s.select_version(0);
    s.add_layer(&png([3, 3, 3, 255]), "y").unwrap();
    assert!(s.history().versions().iter().all(|v| v.id != pinned));

    let idx = s.restore_snapshot(0).unwrap().unwrap();
    assert_eq!(idx, 2);
    let restored = s.current().unwrap();
    assert_ne!(restored.id, pinned);
    assert_eq!(restored.layers[0].name, "x");
    assert_eq!(s.restore_snapshot(9).unwrap(), None);
}

#[tokio::test]
async fn load_and_delete_projects() {
    let (mut s, store) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    s.add_layer(&png([2, 2, 2, 255]), "x").unwrap();
    let first = s.save_project().await.unwrap().unwrap();

    s.new_project().unwrap();
    assert!(s.history().is_empty());
    assert_eq!(s.library().active_id(), None);
    s.import_base(&png([3, 3, 3, 255])).unwrap();
    let second = s.save_project().await.unwrap().unwrap();
    assert_ne!(first, second);
    assert_eq!(s.library().projects()[0].id, second);

    assert!(s.load_project(first).unwrap());
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history().current_index(), Some(1));
    assert!(!s.load_project(ProjectId::new()).unwrap());

    assert!(s.delete_project(second).await.unwrap());
    assert_eq!(s.history().len(), 2);
    assert!(s.delete_project(first).await.unwrap());
    assert!(s.history().is_empty());
    assert_eq!(s.library().active_id(), None);
    assert!(store.is_empty());
}

#[tokio::test]
async fn failed_save_keeps_in_memory_state_for_retry() {
    let store = Arc::new(FlakyStore {
        fail: std::sync::atomic::AtomicBool::new(true),
        inner: InMemoryProjectStore::new(),
    });
    let mut s = EditorSession::new(small_cfg(), store.clone()).unwrap();
    s.import_base(&png([1, 1, 1, 255])).unwrap();

    assert!(matches!(
        s.save_project().await,
        Err(ForgeError::Storage(_))
    ));
    assert_eq!(s.library().projects().len(), 1);
    assert_eq!(s.history().len(), 1);

    store.fail.store(false, std::sync::atomic::Ordering::SeqCst);
    let id = s.save_project().await.unwrap().unwrap();
    assert_eq!(s.library().projects().len(), 1);
    assert_eq!(store.get_all().await.unwrap()[0].id, id);
}

#[tokio::test]
async fn open_loads_saved_projects() {
    let (mut s, store) = session();
    s.import_base(&png([1, 1, 1, 255])).unwrap();
    s.save_project().await.unwrap();

    let reopened = EditorSession::open(small_cfg(), store).await.unwrap();
    assert_eq!(reopened.library().projects(), s.library().projects());
    assert!(reopened.history().is_empty());
}
