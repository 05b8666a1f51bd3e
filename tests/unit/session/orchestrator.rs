use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::foundation::config::EditorConfig;
use crate::foundation::core::Canvas;
use crate::project::store::InMemoryProjectStore;
use crate::scene::layout::LayoutField;
use crate::scene::model::LayoutTarget;
use crate::session::busy::BusyFlag;

fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn session() -> EditorSession {
    let cfg = EditorConfig {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        ..Default::default()
    };
    EditorSession::new(cfg, Arc::new(InMemoryProjectStore::new())).unwrap()
}

#[derive(Default)]
struct FakeService {
    reply: Option<Vec<u8>>,
    chat: Option<String>,
    edits: Mutex<Vec<EditRequest>>,
    generates: Mutex<Vec<GenerateRequest>>,
    chats: Mutex<Vec<ChatRequest>>,
    watch: Option<BusyFlag>,
    busy_during_chat: Mutex<Vec<bool>>,
}

impl FakeService {
    fn answering(bytes: Vec<u8>) -> Self {
        Self {
            reply: Some(bytes),
            chat: Some("Make the title bigger.".to_string()),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageService for FakeService {
    async fn edit(&self, req: EditRequest) -> anyhow::Result<Vec<u8>> {
        self.edits.lock().unwrap().push(req);
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("content filtered"))
    }

    async fn generate(&self, req: GenerateRequest) -> anyhow::Result<Vec<u8>> {
        self.generates.lock().unwrap().push(req);
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("transport error"))
    }

    async fn converse(&self, req: ChatRequest) -> anyhow::Result<String> {
        self.chats.lock().unwrap().push(req);
        if let Some(flag) = &self.watch {
            self.busy_during_chat.lock().unwrap().push(flag.is_busy());
        }
        self.chat.clone().ok_or_else(|| anyhow::anyhow!("timeout"))
    }
}

#[tokio::test]
async fn edit_appends_flattened_result_with_prompt() {
    let mut s = session();
    s.import_base(&png(8, 8, [255, 0, 0, 255])).unwrap();
    s.add_layer(&png(4, 4, [0, 255, 0, 255]), "logo").unwrap();
    let svc = FakeService::answering(png(64, 36, [0, 0, 255, 255]));

    let idx = s
        .submit_edit(&svc, "  add lightning  ", EditMode::Prompt)
        .await
        .unwrap();
    assert_eq!(idx, Some(2));

    let v = s.current().unwrap();
    assert!(v.layers.is_empty());
    assert!(v.base_layout.is_default());
    assert_eq!(v.prompt.as_deref(), Some("add lightning"));
    assert!(!s.is_busy());

    let edits = svc.edits.lock().unwrap();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].instruction.starts_with("add lightning"));
    assert_eq!(edits[0].aspect_ratio, AspectRatio::Widescreen);
    assert_eq!(edits[0].aspect_ratio.as_str(), "16:9");
    let sent = image::load_from_memory(&edits[0].image_png).unwrap();
    assert_eq!((sent.width(), sent.height()), (64, 36));
}

#[tokio::test]
async fn empty_prompt_is_ignored_in_prompt_mode() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    let svc = FakeService::answering(png(64, 36, [0, 0, 0, 255]));
    assert_eq!(
        s.submit_edit(&svc, "   ", EditMode::Prompt).await.unwrap(),
        None
    );
    assert!(svc.edits.lock().unwrap().is_empty());
    assert_eq!(s.history().len(), 1);
}

#[tokio::test]
async fn transform_only_flattens_without_service() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    s.update_layout(LayoutTarget::Base, LayoutField::Scale, 2.0);
    let svc = FakeService::failing();

    let idx = s
        .submit_edit(&svc, "", EditMode::TransformOnly)
        .await
        .unwrap();
    assert_eq!(idx, Some(1));
    assert!(svc.edits.lock().unwrap().is_empty());

    let v = s.current().unwrap();
    assert!(v.prompt.is_none());
    let flat = image::load_from_memory(&v.url.bytes().unwrap()).unwrap();
    assert_eq!((flat.width(), flat.height()), (64, 36));
}

#[tokio::test]
async fn remote_failure_leaves_history_and_clears_busy() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    let before = s.history().clone();

    let err = s
        .submit_edit(&FakeService::failing(), "make it pop", EditMode::Prompt)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Remote(RemoteOp::Edit)));
    assert_eq!(s.history(), &before);
    assert!(!s.is_busy());

    let junk = FakeService::answering(b"<html>rate limited</html>".to_vec());
    let err = s
        .submit_edit(&junk, "make it pop", EditMode::Prompt)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Remote(RemoteOp::Edit)));

    let empty = FakeService::answering(Vec::new());
    assert!(s.submit_edit(&empty, "x", EditMode::Prompt).await.is_err());
    assert_eq!(s.history(), &before);
}

#[tokio::test]
async fn base_decode_failure_surfaces_before_service_call() {
    let mut s = session();
    s.history
        .append(crate::scene::model::Version::from_base(ImageRef::from_raw(
            "data:image/png;base64,AAAA",
        )))
        .unwrap();
    let svc = FakeService::answering(png(64, 36, [0, 0, 0, 255]));

    let err = s
        .submit_edit(&svc, "restyle", EditMode::Prompt)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Decode(_)));
    assert!(svc.edits.lock().unwrap().is_empty());
    assert_eq!(s.history().len(), 1);
    assert!(!s.is_busy());
}

#[tokio::test]
async fn second_operation_while_busy_is_rejected() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    let svc = FakeService::answering(png(64, 36, [0, 0, 0, 255]));
    let flag = s.busy_flag();
    let guard = flag.try_acquire().unwrap();

    assert!(matches!(
        s.submit_edit(&svc, "x", EditMode::Prompt).await,
        Err(ForgeError::Busy)
    ));
    assert!(matches!(
        s.generate_background(&svc, "x").await,
        Err(ForgeError::Busy)
    ));
    assert!(svc.edits.lock().unwrap().is_empty());
    assert!(svc.generates.lock().unwrap().is_empty());
    assert_eq!(s.history().len(), 1);
    drop(guard);
}

#[tokio::test]
async fn generate_background_keeps_layers_on_new_base() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    s.update_layout(LayoutTarget::Base, LayoutField::TranslateX, 30.0);
    let layer = s
        .add_layer(&png(4, 4, [0, 255, 0, 255]), "cutout")
        .unwrap()
        .unwrap();
    let svc = FakeService::answering(png(64, 36, [20, 20, 90, 255]));

    let idx = s.generate_background(&svc, "stormy sky").await.unwrap();
    assert_eq!(idx, Some(2));
    let v = s.current().unwrap();
    assert_eq!(v.layers.len(), 1);
    assert_eq!(v.layers[0].id, layer);
    assert!(v.base_layout.is_default());
    assert_eq!(v.prompt.as_deref(), Some("stormy sky"));
    assert!(
        svc.generates.lock().unwrap()[0]
            .prompt
            .starts_with("stormy sky")
    );
}

#[tokio::test]
async fn generate_background_starts_history_from_nothing() {
    let mut s = session();
    let svc = FakeService::answering(png(64, 36, [20, 20, 90, 255]));
    assert_eq!(s.generate_background(&svc, "  ").await.unwrap(), None);
    assert_eq!(s.generate_background(&svc, "desert").await.unwrap(), Some(0));
    assert!(s.current().unwrap().layers.is_empty());

    let err = s
        .generate_background(&FakeService::failing(), "desert")
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Remote(RemoteOp::Generate)));
    assert_eq!(s.history().len(), 1);
}

#[tokio::test]
async fn preset_uses_its_prompt() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    let svc = FakeService::answering(png(64, 36, [0, 0, 0, 255]));
    s.apply_preset(&svc, StylePreset::NeonGlow).await.unwrap();
    assert_eq!(
        s.current().unwrap().prompt.as_deref(),
        Some(StylePreset::NeonGlow.prompt())
    );
}

#[tokio::test]
async fn coach_gets_message_and_optional_image() {
    let mut s = session();
    let svc = FakeService::answering(png(64, 36, [0, 0, 0, 255]));

    assert_eq!(s.ask_coach(&svc, " ", true).await.unwrap(), None);
    let reply = s.ask_coach(&svc, "what now?", true).await.unwrap();
    assert_eq!(reply.as_deref(), Some("Make the title bigger."));

    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    s.ask_coach(&svc, "and now?", true).await.unwrap();
    s.ask_coach(&svc, "text only", false).await.unwrap();

    let chats = svc.chats.lock().unwrap();
    assert_eq!(chats.len(), 3);
    assert!(chats[0].image_png.is_none());
    assert!(chats[1].image_png.is_some());
    assert!(chats[2].image_png.is_none());
    assert_eq!(s.history().len(), 1);
}

#[tokio::test]
async fn coach_failure_is_collapsed() {
    let mut s = session();
    let err = s
        .ask_coach(&FakeService::failing(), "hello", false)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Remote(RemoteOp::Chat)));
}

#[tokio::test]
async fn coach_holds_busy_flag_for_the_round_trip() {
    let mut s = session();
    s.import_base(&png(8, 8, [1, 1, 1, 255])).unwrap();
    let svc = FakeService {
        watch: Some(s.busy_flag()),
        ..FakeService::answering(Vec::new())
    };

    s.ask_coach(&svc, "is the title readable?", true).await.unwrap();
    assert_eq!(*svc.busy_during_chat.lock().unwrap(), vec![true]);
    assert!(!s.is_busy());

    let flag = s.busy_flag();
    let guard = flag.try_acquire().unwrap();
    assert!(matches!(
        s.ask_coach(&svc, "again?", true).await,
        Err(ForgeError::Busy)
    ));
    assert_eq!(svc.chats.lock().unwrap().len(), 1);
    drop(guard);
}
