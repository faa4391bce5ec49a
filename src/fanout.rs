use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile};
use tracing::{error, info};

use crate::pending::{PendingContent, PendingItem};
use crate::template::{Decorated, Template};

// Telegram caps messages at 4096 chars and captions at 1024; stay under both.
pub const TEXT_LIMIT: usize = 4000;
pub const CAPTION_LIMIT: usize = 1000;

/// A confirmed submission, decorated and ready to deliver.
pub enum OutboundContent {
    Text(Decorated),
    Photo { file_id: FileId, caption: Decorated },
    Video { file_id: FileId, caption: Decorated },
}

impl OutboundContent {
    pub fn build(item: &PendingItem, template: &Template) -> Self {
        match &item.content {
            PendingContent::Text => {
                OutboundContent::Text(template.decorate(&item.text, &item.entities, TEXT_LIMIT))
            }
            PendingContent::Photo { file_id } => OutboundContent::Photo {
                file_id: file_id.clone(),
                caption: template.decorate(&item.text, &item.entities, CAPTION_LIMIT),
            },
            PendingContent::Video { file_id } => OutboundContent::Video {
                file_id: file_id.clone(),
                caption: template.decorate(&item.text, &item.entities, CAPTION_LIMIT),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct SendReport {
    pub delivered: usize,
    pub failed: usize,
}

impl SendReport {
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// Best-effort delivery to the static channel list: one attempt per
/// destination, failures logged and isolated, no retry.
pub struct Broadcaster {
    bot: Bot,
    channels: Vec<ChatId>,
}

impl Broadcaster {
    pub fn new(bot: Bot, channel_ids: &[i64]) -> Self {
        Self {
            bot,
            channels: channel_ids.iter().map(|id| ChatId(*id)).collect(),
        }
    }

    pub async fn send_to_all(&self, content: &OutboundContent) -> SendReport {
        let mut report = SendReport::default();

        for chat in &self.channels {
            match self.send_one(*chat, content).await {
                Ok(()) => {
                    info!("Delivered to channel {}", chat);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!("Failed to deliver to channel {}: {:#}", chat, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn send_one(&self, chat: ChatId, content: &OutboundContent) -> anyhow::Result<()> {
        match content {
            OutboundContent::Text(Decorated::Single { text, entities }) => {
                self.bot
                    .send_message(chat, text.clone())
                    .entities(entities.clone())
                    .await?;
            }
            OutboundContent::Text(Decorated::Chunked(chunks)) => {
                for chunk in chunks {
                    self.bot.send_message(chat, chunk.clone()).await?;
                }
            }
            OutboundContent::Photo { file_id, caption } => match caption {
                Decorated::Single { text, entities } => {
                    self.bot
                        .send_photo(chat, InputFile::file_id(file_id.clone()))
                        .caption(text.clone())
                        .caption_entities(entities.clone())
                        .await?;
                }
                // Caption too long for Telegram: send the media bare and the
                // text as follow-up messages.
                Decorated::Chunked(chunks) => {
                    self.bot
                        .send_photo(chat, InputFile::file_id(file_id.clone()))
                        .await?;
                    for chunk in chunks {
                        self.bot.send_message(chat, chunk.clone()).await?;
                    }
                }
            },
            OutboundContent::Video { file_id, caption } => match caption {
                Decorated::Single { text, entities } => {
                    self.bot
                        .send_video(chat, InputFile::file_id(file_id.clone()))
                        .caption(text.clone())
                        .caption_entities(entities.clone())
                        .await?;
                }
                Decorated::Chunked(chunks) => {
                    self.bot
                        .send_video(chat, InputFile::file_id(file_id.clone()))
                        .await?;
                    for chunk in chunks {
                        self.bot.send_message(chat, chunk.clone()).await?;
                    }
                }
            },
        }
        Ok(())
    }
}
