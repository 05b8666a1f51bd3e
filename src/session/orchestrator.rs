//! Remote-backed operations: compose the current state, call the service, append the result.
//!
//! Every operation holds the busy flag from start to finish, and none of them touch the history
//! unless the whole round trip succeeded.

use crate::assets::decode::decode_ref;
use crate::assets::image_ref::ImageRef;
use crate::foundation::error::{ForgeError, ForgeResult, RemoteOp};
use crate::scene::layout::Layout;
use crate::scene::model::Version;
use crate::service::prompt::{StylePreset, background_prompt, edit_instruction};
use crate::service::{AspectRatio, ChatRequest, EditRequest, GenerateRequest, ImageService};
use crate::session::editor::EditorSession;

/// How an edit submission is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditMode {
    /// Send the composed image and the prompt to the edit service.
    #[default]
    Prompt,
    /// Flatten the current layers and transforms into a new base locally, no service call.
    TransformOnly,
}

impl EditorSession {
    /// Restyle the current composition.
    ///
    /// Returns the new version's index, or `Ok(None)` when there is no current version or the
    /// prompt is empty in [`EditMode::Prompt`].
    #[tracing::instrument(skip(self, service))]
    pub async fn submit_edit(
        &mut self,
        service: &dyn ImageService,
        prompt: &str,
        mode: EditMode,
    ) -> ForgeResult<Option<usize>> {
        let _guard = self.busy.try_acquire().ok_or(ForgeError::Busy)?;
        let prompt = prompt.trim();
        if mode == EditMode::Prompt && prompt.is_empty() {
            return Ok(None);
        }
        let Some(composed) = self.compose_current()? else {
            return Ok(None);
        };
        if !composed.skipped.is_empty() {
            tracing::warn!(skipped = composed.skipped.len(), "submitting composition with skipped layers");
        }

        let result = match mode {
            EditMode::TransformOnly => composed.to_image_ref()?,
            EditMode::Prompt => {
                let req = EditRequest {
                    image_png: composed.encode_png()?,
                    instruction: edit_instruction(prompt),
                    aspect_ratio: AspectRatio::Widescreen,
                };
                tracing::debug!(
                    aspect_ratio = req.aspect_ratio.as_str(),
                    bytes = req.image_png.len(),
                    "sending edit request"
                );
                let bytes = service.edit(req).await;
                remote_image(RemoteOp::Edit, bytes)?
            }
        };

        let mut next = Version::from_base(result);
        if !prompt.is_empty() {
            next.prompt = Some(prompt.to_string());
        }
        self.push_version(next).map(Some)
    }

    /// Restyle with a ready-made preset.
    pub async fn apply_preset(
        &mut self,
        service: &dyn ImageService,
        preset: StylePreset,
    ) -> ForgeResult<Option<usize>> {
        self.submit_edit(service, preset.prompt(), EditMode::Prompt)
            .await
    }

    /// Generate a new background from text and put the current layers on top of it.
    ///
    /// Returns `Ok(None)` for an empty prompt.
    #[tracing::instrument(skip(self, service))]
    pub async fn generate_background(
        &mut self,
        service: &dyn ImageService,
        prompt: &str,
    ) -> ForgeResult<Option<usize>> {
        let _guard = self.busy.try_acquire().ok_or(ForgeError::Busy)?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }

        let req = GenerateRequest {
            prompt: background_prompt(prompt),
            aspect_ratio: AspectRatio::Widescreen,
        };
        let bytes = service.generate(req).await;
        let url = remote_image(RemoteOp::Generate, bytes)?;

        let layers = self
            .history
            .current()
            .map(|v| v.layers.clone())
            .unwrap_or_default();
        let next = Version {
            layers,
            base_layout: Layout::default(),
            ..Version::from_base(url).with_prompt(prompt)
        };
        self.push_version(next).map(Some)
    }

    /// Ask the coach a question, optionally attaching the current composition.
    ///
    /// Holds the busy flag for the round trip but never changes the history. Returns `Ok(None)`
    /// for an empty message.
    #[tracing::instrument(skip(self, service))]
    pub async fn ask_coach(
        &mut self,
        service: &dyn ImageService,
        message: &str,
        include_image: bool,
    ) -> ForgeResult<Option<String>> {
        let _guard = self.busy.try_acquire().ok_or(ForgeError::Busy)?;
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }
        let image_png = if include_image {
            self.compose_current()?
                .map(|composed| composed.encode_png())
                .transpose()?
        } else {
            None
        };

        let req = ChatRequest {
            message: message.to_string(),
            image_png,
        };
        match service.converse(req).await {
            Ok(reply) if !reply.trim().is_empty() => Ok(Some(reply)),
            Ok(_) => {
                tracing::warn!("coach returned an empty reply");
                Err(ForgeError::Remote(RemoteOp::Chat))
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "coach request failed");
                Err(ForgeError::Remote(RemoteOp::Chat))
            }
        }
    }
}

/// Collapse a service response into a usable image reference.
fn remote_image(op: RemoteOp, bytes: anyhow::Result<Vec<u8>>) -> ForgeResult<ImageRef> {
    let bytes = bytes.map_err(|e| {
        tracing::warn!(?op, error = %format!("{e:#}"), "remote request failed");
        ForgeError::Remote(op)
    })?;
    if bytes.is_empty() {
        tracing::warn!(?op, "remote returned no image");
        return Err(ForgeError::Remote(op));
    }
    let url = ImageRef::from_bytes(&bytes)
        .and_then(|url| decode_ref(&url).map(|_| url))
        .map_err(|e| {
            tracing::warn!(?op, error = %e, "remote returned an unusable image");
            ForgeError::Remote(op)
        })?;
    Ok(url)
}

#[cfg(test)]
#[path = "../../tests/unit/session/orchestrator.rs"]
mod tests;
